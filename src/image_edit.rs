//! Image editor pane state.
//!
//! Preview URIs and the instruction survive a restart through the store; the
//! loaded file itself does not. A restored preview without a file is the
//! `NeedsReupload` phase, in which editing stays disabled until the user
//! picks the image again.

use crate::api::{ApiError, GenerativeBackend};
use crate::constants::{
    EDITED_IMAGE_KEY, IMAGE_NOT_RETURNED_MESSAGE, IMAGE_PROMPT_KEY, IMAGE_UNEXPECTED_MESSAGE,
    IMAGE_UNSUPPORTED_MESSAGE, IMAGE_VALIDATION_MESSAGE, SOURCE_IMAGE_KEY,
};
use crate::storage::{read_or_default, write_or_remove, SharedStore};
use crate::utils::{decode_data_uri, encode_data_uri, image_mime_for, read_file_bytes};
use std::cell::RefCell;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageEditError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("An edit is already running")]
    Busy,
    #[error("No edited image to save")]
    NothingToSave,
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// The image currently held in memory. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    NeedsReupload,
    Ready,
    Editing,
    Edited,
    Error,
}

/// Payload of one edit request.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub instruction: String,
}

pub struct ImageEditor {
    source: Option<SourceImage>,
    source_preview: Option<String>,
    edited_preview: Option<String>,
    prompt: String,
    loading: bool,
    error: Option<String>,
    store: SharedStore,
}

impl ImageEditor {
    /// Restores previews and the instruction. The file handle always starts empty.
    pub fn restore(store: SharedStore) -> Self {
        let source_preview = read_or_default(store.as_ref(), SOURCE_IMAGE_KEY);
        let edited_preview = read_or_default(store.as_ref(), EDITED_IMAGE_KEY);
        let prompt = read_or_default(store.as_ref(), IMAGE_PROMPT_KEY).unwrap_or_default();
        if source_preview.is_some() {
            tracing::info!("Restored image previews; the source file must be selected again");
        }
        Self {
            source: None,
            source_preview,
            edited_preview,
            prompt,
            loading: false,
            error: None,
            store,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Editing
        } else if self.error.is_some() && self.source.is_some() {
            Phase::Error
        } else if self.source.is_none() {
            if self.source_preview.is_some() {
                Phase::NeedsReupload
            } else {
                Phase::Empty
            }
        } else if self.edited_preview.is_some() {
            Phase::Edited
        } else {
            Phase::Ready
        }
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn source_preview(&self) -> Option<&str> {
        self.source_preview.as_deref()
    }

    pub fn edited_preview(&self) -> Option<&str> {
        self.edited_preview.as_deref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True when a preview survived a restart but the file has to be picked again.
    pub fn needs_reupload(&self) -> bool {
        self.source.is_none() && self.source_preview.is_some()
    }

    pub fn can_edit(&self) -> bool {
        !self.loading && self.source.is_some() && !self.prompt.trim().is_empty()
    }

    fn persist_previews(&self) {
        write_or_remove(
            self.store.as_ref(),
            SOURCE_IMAGE_KEY,
            self.source_preview.as_deref(),
        );
        write_or_remove(
            self.store.as_ref(),
            EDITED_IMAGE_KEY,
            self.edited_preview.as_deref(),
        );
    }

    /// Reads an image from disk and makes it the edit source.
    pub fn select_file(&mut self, path: &Path) -> Result<(), ImageEditError> {
        if self.loading {
            return Err(ImageEditError::Busy);
        }
        let mime_type = image_mime_for(path).ok_or_else(|| {
            ImageEditError::UnsupportedType(path.to_string_lossy().to_string())
        })?;
        let bytes = read_file_bytes(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.load_source(SourceImage {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        });
        Ok(())
    }

    /// Replaces the source image and discards any previous result.
    pub fn load_source(&mut self, image: SourceImage) {
        tracing::info!(
            "Loaded source image {} ({}, {} bytes)",
            image.file_name,
            image.mime_type,
            image.bytes.len()
        );
        self.source_preview = Some(encode_data_uri(&image.mime_type, &image.bytes));
        self.source = Some(image);
        self.edited_preview = None;
        self.error = None;
        self.persist_previews();
    }

    /// Records a rejected selection so the pane can show it inline.
    pub fn reject_selection(&mut self, err: &ImageEditError) {
        tracing::warn!("Image selection rejected: {}", err);
        self.error = Some(match err {
            ImageEditError::UnsupportedType(_) => IMAGE_UNSUPPORTED_MESSAGE.to_string(),
            _ => IMAGE_UNEXPECTED_MESSAGE.to_string(),
        });
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        write_or_remove(self.store.as_ref(), IMAGE_PROMPT_KEY, Some(&self.prompt));
    }

    /// Validates locally and enters the editing phase.
    pub fn begin_edit(&mut self) -> Result<EditRequest, ImageEditError> {
        if self.loading {
            return Err(ImageEditError::Busy);
        }
        let source = match &self.source {
            Some(source) if !self.prompt.trim().is_empty() => source,
            _ => {
                self.error = Some(IMAGE_VALIDATION_MESSAGE.to_string());
                return Err(ImageEditError::Validation(IMAGE_VALIDATION_MESSAGE));
            }
        };
        let request = EditRequest {
            bytes: source.bytes.clone(),
            mime_type: source.mime_type.clone(),
            instruction: self.prompt.clone(),
        };
        self.loading = true;
        self.error = None;
        self.edited_preview = None;
        self.persist_previews();
        Ok(request)
    }

    pub fn finish_edit(&mut self, result: Result<Option<String>, ApiError>) {
        self.loading = false;
        match result {
            Ok(Some(uri)) => {
                tracing::info!("Image edit succeeded");
                self.edited_preview = Some(uri);
                self.persist_previews();
            }
            Ok(None) => {
                tracing::warn!("Image edit returned no image part");
                self.error = Some(IMAGE_NOT_RETURNED_MESSAGE.to_string());
            }
            Err(e) => {
                tracing::error!("Error in image edit: {}", e);
                self.error = Some(IMAGE_UNEXPECTED_MESSAGE.to_string());
            }
        }
    }

    pub fn reset(&mut self) {
        self.source = None;
        self.source_preview = None;
        self.edited_preview = None;
        self.prompt.clear();
        self.error = None;
        self.loading = false;
        self.persist_previews();
        write_or_remove(self.store.as_ref(), IMAGE_PROMPT_KEY, None);
    }

    /// Writes the edited image to `path`.
    pub fn save_edited(&self, path: &Path) -> Result<(), ImageEditError> {
        let uri = self
            .edited_preview
            .as_deref()
            .ok_or(ImageEditError::NothingToSave)?;
        let (_, bytes) = decode_data_uri(uri)?;
        crate::utils::write_file_atomic(path, &bytes)?;
        tracing::info!("Saved edited image to {:?}", path);
        Ok(())
    }
}

/// Runs one edit. The pane is only borrowed around the await, never across it.
///
/// `on_update` sees the editor once the request starts and again when it ends.
pub async fn edit<F>(
    editor: &RefCell<ImageEditor>,
    backend: &dyn GenerativeBackend,
    mut on_update: F,
) -> Result<(), ImageEditError>
where
    F: FnMut(&ImageEditor),
{
    let request = editor.borrow_mut().begin_edit()?;
    on_update(&editor.borrow());
    let result = backend
        .edit_image(request.bytes, &request.mime_type, &request.instruction)
        .await;
    editor.borrow_mut().finish_edit(result);
    on_update(&editor.borrow());
    Ok(())
}
