use crate::api::{ApiError, GenerativeBackend, TextStream, Turn};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Conversational context reused across chat turns.
///
/// Owned by the chat pane and created once per launch. The remote API is
/// stateless, so the session keeps the exchanged turns and replays them with
/// every request.
pub struct ChatSession {
    backend: Arc<dyn GenerativeBackend>,
    system_instruction: Option<String>,
    context: Vec<Turn>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn GenerativeBackend>, system_instruction: Option<String>) -> Self {
        Self {
            backend,
            system_instruction: system_instruction.filter(|s| !s.trim().is_empty()),
            context: Vec::new(),
        }
    }

    /// Starts a turn. The returned future owns everything it needs, so the
    /// session can be borrowed only briefly.
    pub fn send_chat_turn(&self, text: &str) -> BoxFuture<'static, Result<TextStream, ApiError>> {
        let backend = Arc::clone(&self.backend);
        let history = self.context.clone();
        let system_instruction = self.system_instruction.clone();
        let text = text.to_string();
        Box::pin(async move { backend.stream_chat(history, system_instruction, &text).await })
    }

    /// Adds a completed exchange to the context sent with later turns.
    pub fn record_exchange(&mut self, user_text: &str, model_text: &str) {
        self.context.push(Turn::user(user_text));
        self.context.push(Turn::model(model_text));
    }

    pub fn context(&self) -> &[Turn] {
        &self.context
    }

    pub fn reset(&mut self) {
        self.context.clear();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend shared by the pane tests.

    use crate::api::{
        ApiError, GenerativeBackend, GroundedResponse, QualityTier, TextStream, Turn,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeBackend {
        pub fragments: Vec<String>,
        /// Fails the stream after emitting this many fragments.
        pub fail_after: Option<usize>,
        pub fail_requests: bool,
        pub text: String,
        pub grounded: Option<GroundedResponse>,
        pub image: Option<String>,
        pub calls: AtomicUsize,
        pub chat_requests: Mutex<Vec<(Vec<Turn>, Option<String>, String)>>,
        pub tiers: Mutex<Vec<QualityTier>>,
    }

    impl FakeBackend {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_requests {
                Err(ApiError::Response {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl GenerativeBackend for FakeBackend {
        fn name(&self) -> &str {
            "Fake"
        }

        async fn stream_chat(
            &self,
            history: Vec<Turn>,
            system_instruction: Option<String>,
            text: &str,
        ) -> Result<TextStream, ApiError> {
            self.check()?;
            if let Ok(mut requests) = self.chat_requests.lock() {
                requests.push((history, system_instruction, text.to_string()));
            }
            let mut items: Vec<Result<String, ApiError>> =
                self.fragments.iter().cloned().map(Ok).collect();
            if let Some(n) = self.fail_after {
                items.truncate(n);
                items.push(Err(ApiError::Stream("connection reset".to_string())));
            }
            Ok(Box::pin(futures::stream::iter(items)))
        }

        async fn generate(&self, _prompt: &str, tier: QualityTier) -> Result<String, ApiError> {
            self.check()?;
            if let Ok(mut tiers) = self.tiers.lock() {
                tiers.push(tier);
            }
            Ok(self.text.clone())
        }

        async fn generate_grounded(&self, _prompt: &str) -> Result<GroundedResponse, ApiError> {
            self.check()?;
            Ok(self.grounded.clone().unwrap_or(GroundedResponse {
                text: self.text.clone(),
                sources: Vec::new(),
            }))
        }

        async fn edit_image(
            &self,
            _image: Vec<u8>,
            _mime_type: &str,
            _instruction: &str,
        ) -> Result<Option<String>, ApiError> {
            self.check()?;
            Ok(self.image.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeBackend;
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_session_replays_recorded_context() {
        let backend = Arc::new(FakeBackend {
            fragments: vec!["ok".to_string()],
            ..Default::default()
        });
        let mut session = ChatSession::new(backend.clone(), Some("be kind".to_string()));

        let stream = session.send_chat_turn("first").await.unwrap();
        let reply: Vec<_> = stream.collect().await;
        assert_eq!(reply.len(), 1);
        session.record_exchange("first", "ok");

        let _ = session.send_chat_turn("second").await.unwrap();

        let requests = backend.chat_requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].0.is_empty());
        assert_eq!(requests[1].0, vec![Turn::user("first"), Turn::model("ok")]);
        assert_eq!(requests[1].1.as_deref(), Some("be kind"));
        assert_eq!(requests[1].2, "second");
    }

    #[test]
    fn test_blank_system_instruction_is_dropped() {
        let session = ChatSession::new(Arc::new(FakeBackend::default()), Some("  ".to_string()));
        assert!(session.system_instruction.is_none());
        assert!(session.context().is_empty());
    }
}
