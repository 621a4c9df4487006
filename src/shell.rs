//! Mode selection for the main window.

use crate::constants::ACTIVE_MODE_KEY;
use crate::responder::ResponderKind;
use crate::storage::{read_or_default, write_or_remove, SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Chat,
    Complex,
    Fast,
    Grounded,
    ImageEdit,
}

impl Mode {
    /// Navigation order.
    pub const ALL: [Mode; 5] = [
        Mode::Chat,
        Mode::Complex,
        Mode::Fast,
        Mode::Grounded,
        Mode::ImageEdit,
    ];

    /// Stable identifier used for persistence and stack page names.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Chat => "CHAT",
            Self::Complex => "COMPLEX_QUERY",
            Self::Fast => "LOW_LATENCY",
            Self::Grounded => "SEARCH_GROUNDING",
            Self::ImageEdit => "IMAGE_EDIT",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat => "Sohbet",
            Self::Complex => "Düşünme Modu",
            Self::Fast => "Hızlı Yanıtlar",
            Self::Grounded => "Arama Temelli",
            Self::ImageEdit => "Görsel Düzenleyici",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Chat => "user-available-symbolic",
            Self::Complex => "applications-science-symbolic",
            Self::Fast => "media-seek-forward-symbolic",
            Self::Grounded => "system-search-symbolic",
            Self::ImageEdit => "image-x-generic-symbolic",
        }
    }

    /// The prompt pane variant behind this mode, if it is one.
    pub fn responder_kind(&self) -> Option<ResponderKind> {
        match self {
            Self::Complex => Some(ResponderKind::Complex),
            Self::Fast => Some(ResponderKind::Fast),
            Self::Grounded => Some(ResponderKind::Grounded),
            Self::Chat | Self::ImageEdit => None,
        }
    }
}

/// Tracks which pane is visible. Exactly one mode is active at a time.
pub struct Shell {
    active: Mode,
    store: SharedStore,
}

impl Shell {
    pub fn restore(store: SharedStore) -> Self {
        let active = match read_or_default(store.as_ref(), ACTIVE_MODE_KEY) {
            Some(id) => Mode::from_id(&id).unwrap_or_else(|| {
                tracing::warn!("Unknown stored mode '{}', falling back to chat", id);
                Mode::Chat
            }),
            None => Mode::Chat,
        };
        Self { active, store }
    }

    pub fn active(&self) -> Mode {
        self.active
    }

    /// Switches the visible pane. Returns false if `mode` was already active.
    pub fn select(&mut self, mode: Mode) -> bool {
        if self.active == mode {
            return false;
        }
        tracing::debug!("Switching mode {:?} -> {:?}", self.active, mode);
        self.active = mode;
        write_or_remove(self.store.as_ref(), ACTIVE_MODE_KEY, Some(mode.id()));
        true
    }
}
