//! UI module containing the window's panes and signal handlers.

pub mod chat;
pub mod header;
pub mod image_editor;
pub mod layout;
pub mod responder;
pub mod settings;
pub mod sidebar;
pub mod webview;
