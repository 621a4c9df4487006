//! Conversation state for the chat pane.
//!
//! The turn list is persisted in full after every mutation under
//! [`CHAT_HISTORY_KEY`], and loaded once when the pane is built.

use crate::api::session::ChatSession;
use crate::api::{ApiError, GenerativeBackend, Role, TextStream, Turn};
use crate::constants::{CHAT_ERROR_MESSAGE, CHAT_HISTORY_KEY, STREAMING_CURSOR};
use crate::storage::{read_or_default, SharedStore};
use futures::{Stream, StreamExt};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still streaming")]
    Busy,
}

pub struct ChatHistory {
    turns: Vec<Turn>,
    loading: bool,
    store: SharedStore,
}

impl ChatHistory {
    /// Loads the stored conversation. Missing or malformed data yields an empty one.
    pub fn load(store: SharedStore) -> Self {
        let turns = match read_or_default(store.as_ref(), CHAT_HISTORY_KEY) {
            Some(raw) => serde_json::from_str::<Vec<Turn>>(&raw).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable chat history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        tracing::debug!("Loaded {} chat turn(s)", turns.len());
        Self {
            turns,
            loading: false,
            store,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.turns)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.store.set(CHAT_HISTORY_KEY, &json));
        if let Err(e) = result {
            tracing::error!("Failed to save chat history: {}", e);
        }
    }

    pub fn append_user_turn(&mut self, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.loading {
            return Err(ChatError::Busy);
        }
        self.turns.push(Turn::user(text));
        self.loading = true;
        self.persist();
        Ok(())
    }

    /// Pushes the empty model turn that streamed text will replace.
    pub fn begin_model_turn(&mut self) {
        self.turns.push(Turn::model(String::new()));
        self.persist();
    }

    fn replace_last_model_turn(&mut self, text: String) {
        match self.turns.last_mut() {
            Some(last) if last.role == Role::Model => last.text = text,
            _ => self.turns.push(Turn::model(text)),
        }
        self.persist();
    }

    /// Shows the text received so far followed by the streaming cursor.
    pub fn show_partial(&mut self, text_so_far: &str) {
        let mut text = String::with_capacity(text_so_far.len() + STREAMING_CURSOR.len_utf8());
        text.push_str(text_so_far);
        text.push(STREAMING_CURSOR);
        self.replace_last_model_turn(text);
    }

    /// Finalizes the streamed turn without the cursor glyph.
    pub fn complete_model_turn(&mut self, text: &str) {
        self.replace_last_model_turn(text.to_string());
        self.loading = false;
    }

    /// Keeps whatever arrived before a stream failure, without the cursor.
    pub fn interrupt_model_turn(&mut self, partial: &str) {
        if !partial.is_empty() {
            self.replace_last_model_turn(partial.to_string());
        }
        self.loading = false;
    }

    /// Shows `message` in place of the empty placeholder, or as a new model turn.
    pub fn fail_model_turn(&mut self, message: &str) {
        match self.turns.last_mut() {
            Some(last) if last.role == Role::Model && last.text.is_empty() => {
                last.text = message.to_string();
            }
            _ => self.turns.push(Turn::model(message)),
        }
        self.loading = false;
        self.persist();
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.loading = false;
        self.persist();
    }
}

/// Pulls fragments one at a time into the last model turn.
///
/// `on_update` sees the turn list after each change, while no mutable borrow
/// is held. Returns the full reply, or the stream's error after keeping the
/// partial text.
pub async fn stream_model_turn<S, F>(
    history: &RefCell<ChatHistory>,
    mut fragments: S,
    mut on_update: F,
) -> Result<String, ApiError>
where
    S: Stream<Item = Result<String, ApiError>> + Unpin,
    F: FnMut(&[Turn]),
{
    history.borrow_mut().begin_model_turn();
    on_update(history.borrow().turns());

    let mut reply = String::new();
    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(text) => {
                reply.push_str(&text);
                history.borrow_mut().show_partial(&reply);
                on_update(history.borrow().turns());
            }
            Err(e) => {
                history.borrow_mut().interrupt_model_turn(&reply);
                on_update(history.borrow().turns());
                return Err(e);
            }
        }
    }

    history.borrow_mut().complete_model_turn(&reply);
    on_update(history.borrow().turns());
    Ok(reply)
}

/// Chat pane control flow: owns the session and degrades failures to the
/// fixed chat error message.
pub struct ChatController {
    history: RefCell<ChatHistory>,
    session: RefCell<ChatSession>,
    /// Bumped whenever the session is replaced or reset.
    generation: Cell<u64>,
}

impl ChatController {
    pub fn new(
        store: SharedStore,
        backend: Arc<dyn GenerativeBackend>,
        system_instruction: Option<String>,
    ) -> Self {
        Self {
            history: RefCell::new(ChatHistory::load(store)),
            session: RefCell::new(ChatSession::new(backend, system_instruction)),
            generation: Cell::new(0),
        }
    }

    pub fn history(&self) -> &RefCell<ChatHistory> {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.history.borrow().is_loading()
    }

    /// Starts a fresh session, e.g. after the backend configuration changed.
    pub fn rebind(&self, backend: Arc<dyn GenerativeBackend>, system_instruction: Option<String>) {
        *self.session.borrow_mut() = ChatSession::new(backend, system_instruction);
        self.generation.set(self.generation.get() + 1);
    }

    pub fn clear(&self) {
        self.history.borrow_mut().clear();
        self.session.borrow_mut().reset();
        self.generation.set(self.generation.get() + 1);
    }

    /// Sends `text` and streams the reply. Rejected input never reaches the backend.
    pub async fn send<F>(&self, text: &str, mut on_update: F) -> Result<(), ChatError>
    where
        F: FnMut(&[Turn]),
    {
        self.history.borrow_mut().append_user_turn(text)?;
        on_update(self.history.borrow().turns());

        let generation = self.generation.get();
        let pending = self.session.borrow().send_chat_turn(text);
        let outcome = match pending.await {
            Ok(fragments) => self.consume(fragments, &mut on_update).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(reply) => {
                if self.generation.get() == generation {
                    self.session.borrow_mut().record_exchange(text, &reply);
                } else {
                    tracing::debug!("Session replaced mid-reply, exchange not recorded");
                }
                tracing::info!("Chat reply complete ({} chars)", reply.chars().count());
            }
            Err(e) => {
                tracing::error!("Chatbot error: {}", e);
                self.history.borrow_mut().fail_model_turn(CHAT_ERROR_MESSAGE);
                on_update(self.history.borrow().turns());
            }
        }
        Ok(())
    }

    async fn consume<F>(&self, fragments: TextStream, on_update: &mut F) -> Result<String, ApiError>
    where
        F: FnMut(&[Turn]),
    {
        stream_model_turn(&self.history, fragments, |turns| on_update(turns)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::testing::FakeBackend;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::rc::Rc;

    fn memory_store() -> Rc<MemoryStore> {
        Rc::new(MemoryStore::new())
    }

    fn ok_stream(fragments: &[&str]) -> TextStream {
        let items: Vec<Result<String, ApiError>> =
            fragments.iter().map(|f| Ok(f.to_string())).collect();
        Box::pin(futures::stream::iter(items))
    }

    #[test]
    fn test_history_roundtrips_through_storage() {
        let store = memory_store();
        {
            let mut history = ChatHistory::load(store.clone());
            history.append_user_turn("Selam").unwrap();
            history.begin_model_turn();
            history.complete_model_turn("Merhaba! Benim adım Nexus.");
            history.append_user_turn("Nasılsın?").unwrap();
        }

        let reloaded = ChatHistory::load(store);
        assert_eq!(
            reloaded.turns(),
            &[
                Turn::user("Selam"),
                Turn::model("Merhaba! Benim adım Nexus."),
                Turn::user("Nasılsın?"),
            ]
        );
        assert!(!reloaded.is_loading());
    }

    #[test]
    fn test_malformed_record_loads_empty() {
        let store = memory_store();
        store.set(CHAT_HISTORY_KEY, "{\"oops\": true").unwrap();
        assert!(ChatHistory::load(store).turns().is_empty());
    }

    #[test]
    fn test_original_layout_is_readable() {
        let store = memory_store();
        store
            .set(
                CHAT_HISTORY_KEY,
                r#"[{"role":"user","parts":[{"text":"hi"}]},{"role":"model","parts":[{"text":"hello"}]}]"#,
            )
            .unwrap();
        let history = ChatHistory::load(store);
        assert_eq!(history.turns(), &[Turn::user("hi"), Turn::model("hello")]);
    }

    #[test]
    fn test_blank_input_is_rejected() {
        let mut history = ChatHistory::load(memory_store());
        assert_eq!(history.append_user_turn("   \n"), Err(ChatError::EmptyMessage));
        assert!(history.turns().is_empty());
    }

    #[test]
    fn test_second_turn_rejected_while_loading() {
        let mut history = ChatHistory::load(memory_store());
        history.append_user_turn("first").unwrap();
        assert_eq!(history.append_user_turn("second"), Err(ChatError::Busy));
        assert_eq!(history.turns().len(), 1);
    }

    #[tokio::test]
    async fn test_streaming_shows_cursor_until_complete() {
        let history = RefCell::new(ChatHistory::load(memory_store()));
        history.borrow_mut().append_user_turn("Selam de").unwrap();

        let mut states = Vec::new();
        let reply = stream_model_turn(&history, ok_stream(&["Mer", "haba"]), |turns| {
            states.push(turns.last().map(|t| t.text.clone()).unwrap_or_default());
        })
        .await
        .unwrap();

        assert_eq!(reply, "Merhaba");
        // The empty placeholder comes first, then the streamed states.
        assert_eq!(states, vec!["", "Mer▋", "Merhaba▋", "Merhaba"]);
        assert!(!history.borrow().is_loading());
    }

    #[tokio::test]
    async fn test_every_streamed_state_is_persisted() {
        let store = memory_store();
        let history = RefCell::new(ChatHistory::load(store.clone()));
        history.borrow_mut().append_user_turn("q").unwrap();

        let mut persisted = Vec::new();
        stream_model_turn(&history, ok_stream(&["a", "b"]), |_| {
            persisted.push(store.get(CHAT_HISTORY_KEY).unwrap().unwrap());
        })
        .await
        .unwrap();

        assert!(persisted[1].contains("a▋"));
        assert!(persisted[3].contains(r#""text":"ab""#));
        assert!(!persisted[3].contains('▋'));
    }

    #[tokio::test]
    async fn test_stream_error_keeps_partial_without_cursor() {
        let history = RefCell::new(ChatHistory::load(memory_store()));
        history.borrow_mut().append_user_turn("q").unwrap();

        let items: Vec<Result<String, ApiError>> = vec![
            Ok("Yarım".to_string()),
            Err(ApiError::Stream("reset".to_string())),
        ];
        let result = stream_model_turn(&history, futures::stream::iter(items), |_| {}).await;

        assert!(result.is_err());
        let history = history.borrow();
        assert_eq!(history.turns().last(), Some(&Turn::model("Yarım")));
        assert!(!history.is_loading());
    }

    #[test]
    fn test_fail_replaces_empty_placeholder() {
        let mut history = ChatHistory::load(memory_store());
        history.append_user_turn("q").unwrap();
        history.begin_model_turn();
        history.fail_model_turn(CHAT_ERROR_MESSAGE);

        assert_eq!(
            history.turns(),
            &[Turn::user("q"), Turn::model(CHAT_ERROR_MESSAGE)]
        );
    }

    #[tokio::test]
    async fn test_controller_records_exchange_in_session() {
        let backend = Arc::new(FakeBackend {
            fragments: vec!["Mer".to_string(), "haba".to_string()],
            ..Default::default()
        });
        let controller = ChatController::new(memory_store(), backend.clone(), None);

        controller.send("Selam", |_| {}).await.unwrap();
        controller.send("Tekrar", |_| {}).await.unwrap();

        let requests = backend.chat_requests.lock().unwrap();
        assert_eq!(requests[1].0, vec![Turn::user("Selam"), Turn::model("Merhaba")]);
        assert_eq!(controller.history().borrow().turns().len(), 4);
    }

    #[tokio::test]
    async fn test_rebind_during_reply_leaves_new_session_empty() {
        let old = Arc::new(FakeBackend {
            fragments: vec!["Mer".to_string(), "haba".to_string()],
            ..Default::default()
        });
        let new = Arc::new(FakeBackend {
            fragments: vec!["Tamam".to_string()],
            ..Default::default()
        });
        let controller = ChatController::new(memory_store(), old.clone(), None);

        let mut rebound = false;
        controller
            .send("Selam", |turns| {
                if !rebound && turns.len() == 2 {
                    controller.rebind(new.clone(), None);
                    rebound = true;
                }
            })
            .await
            .unwrap();
        assert!(rebound);
        assert_eq!(
            controller.history().borrow().turns().last(),
            Some(&Turn::model("Merhaba"))
        );

        controller.send("Tekrar", |_| {}).await.unwrap();
        assert_eq!(old.calls(), 1);
        let requests = new.chat_requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].0.is_empty());
    }

    #[tokio::test]
    async fn test_controller_degrades_request_failure() {
        let backend = Arc::new(FakeBackend {
            fail_requests: true,
            ..Default::default()
        });
        let controller = ChatController::new(memory_store(), backend.clone(), None);

        controller.send("Selam", |_| {}).await.unwrap();

        let history = controller.history().borrow();
        assert_eq!(
            history.turns(),
            &[Turn::user("Selam"), Turn::model(CHAT_ERROR_MESSAGE)]
        );
        assert!(!history.is_loading());
    }

    #[tokio::test]
    async fn test_controller_appends_error_after_partial_reply() {
        let backend = Arc::new(FakeBackend {
            fragments: vec!["Kısmi".to_string(), "cevap".to_string()],
            fail_after: Some(1),
            ..Default::default()
        });
        let controller = ChatController::new(memory_store(), backend.clone(), None);

        controller.send("Selam", |_| {}).await.unwrap();

        let history = controller.history().borrow();
        assert_eq!(
            history.turns(),
            &[
                Turn::user("Selam"),
                Turn::model("Kısmi"),
                Turn::model(CHAT_ERROR_MESSAGE)
            ]
        );
    }

    #[tokio::test]
    async fn test_controller_blank_input_makes_no_call() {
        let backend = Arc::new(FakeBackend::default());
        let controller = ChatController::new(memory_store(), backend.clone(), None);

        assert_eq!(
            controller.send("  ", |_| {}).await,
            Err(ChatError::EmptyMessage)
        );
        assert_eq!(backend.calls(), 0);
    }
}
