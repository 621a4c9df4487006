//! Nexus AI: a desktop assistant over the Gemini API.
//!
//! The library holds everything that does not touch GTK: the API gateway,
//! pane state machines, persistence and rendering. The `nexus-ai` binary
//! wires these into the window.

pub mod api;
pub mod chat;
pub mod config;
pub mod constants;
pub mod image_edit;
pub mod render;
pub mod responder;
pub mod shell;
pub mod storage;
pub mod utils;
