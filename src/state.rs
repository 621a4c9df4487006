use nexus::api::{create_backend, GenerativeBackend};
use nexus::chat::ChatController;
use nexus::config::AppConfig;
use nexus::image_edit::ImageEditor;
use nexus::shell::Shell;
use nexus::storage::SharedStore;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Central application state shared by the window's panes.
pub struct AppState {
    pub config: AppConfig,
    /// Gateway used for every new request. Replaced when settings change.
    backend: Arc<dyn GenerativeBackend>,
    pub shell: Shell,
    pub chat: Rc<ChatController>,
    pub image_editor: Rc<RefCell<ImageEditor>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Self {
        let backend = create_backend(&config);
        tracing::info!("Using {} backend at {}", backend.name(), config.base_url);
        let chat = Rc::new(ChatController::new(
            store.clone(),
            Arc::clone(&backend),
            Some(config.system_instruction.clone()),
        ));
        Self {
            shell: Shell::restore(store.clone()),
            image_editor: Rc::new(RefCell::new(ImageEditor::restore(store))),
            chat,
            backend,
            config,
        }
    }

    pub fn backend(&self) -> Arc<dyn GenerativeBackend> {
        Arc::clone(&self.backend)
    }

    pub fn has_api_key(&self) -> bool {
        self.config.resolved_api_key().is_some()
    }

    /// Rebuilds the gateway and starts a fresh chat session. Requests already
    /// in flight finish against the old gateway.
    pub fn apply_config(&mut self, config: AppConfig) {
        self.backend = create_backend(&config);
        self.chat.rebind(
            Arc::clone(&self.backend),
            Some(config.system_instruction.clone()),
        );
        self.config = config;
        tracing::info!("Configuration applied");
    }
}
