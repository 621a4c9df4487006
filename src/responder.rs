//! Single prompt, single answer panes (thinking, fast and search-grounded modes).

use crate::api::{ApiError, GenerativeBackend, GroundingSource, QualityTier};
use crate::constants::{COMPLEX_ERROR_MESSAGE, FAST_ERROR_MESSAGE, GROUNDED_ERROR_MESSAGE};
use std::cell::RefCell;
use thiserror::Error;

/// What a prompt pane displays after a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    /// Present only for search-grounded answers.
    pub sources: Option<Vec<GroundingSource>>,
}

impl Answer {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderKind {
    Complex,
    Fast,
    Grounded,
}

impl ResponderKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Complex => "Düşünme Modu",
            Self::Fast => "Düşük Gecikmeli Yanıtlar",
            Self::Grounded => "Arama Temelli Yanıtlar",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Complex => "En karmaşık sorgularınız için Nexus AI ile etkileşime geçin. Model, derin ve iyi gerekçelendirilmiş yanıtlar sağlamak için maksimum düşünme bütçesini kullanır.",
            Self::Fast => "Yüksek düzeyde optimize edilmiş Nexus AI modelini kullanarak basit görevler için hızlı yanıtlar alın.",
            Self::Grounded => "Güncel bilgi gerektiren son olaylar veya konular hakkında sorular sorun. Nexus AI, yanıtını temel almak için Google Arama'yı kullanacaktır.",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Complex => "örn., Görelilik teorisini beş yaşındaymışım gibi açıkla...",
            Self::Fast => "örn., Fransa'nın başkenti neresidir?",
            Self::Grounded => "örn., Son F1 yarışını kim kazandı?",
        }
    }

    pub fn button_text(&self) -> &'static str {
        match self {
            Self::Complex => "Karmaşık Sorguyu Çalıştır",
            Self::Fast => "Hızlı Yanıt Al",
            Self::Grounded => "Nexus ile Ara",
        }
    }

    /// Fixed message shown whenever the remote call fails.
    pub fn error_message(&self) -> &'static str {
        match self {
            Self::Complex => COMPLEX_ERROR_MESSAGE,
            Self::Fast => FAST_ERROR_MESSAGE,
            Self::Grounded => GROUNDED_ERROR_MESSAGE,
        }
    }

    pub async fn run(
        &self,
        backend: &dyn GenerativeBackend,
        prompt: &str,
    ) -> Result<Answer, ApiError> {
        match self {
            Self::Complex => backend
                .generate(prompt, QualityTier::Deep)
                .await
                .map(Answer::plain),
            Self::Fast => backend
                .generate(prompt, QualityTier::Fast)
                .await
                .map(Answer::plain),
            Self::Grounded => backend.generate_grounded(prompt).await.map(|r| Answer {
                text: r.text,
                sources: Some(r.sources),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderState {
    Idle,
    Submitting,
    Success(Answer),
    Error(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Prompt is empty")]
    EmptyPrompt,
    #[error("A request is already in flight")]
    InFlight,
}

pub struct PromptResponder {
    kind: ResponderKind,
    prompt: String,
    state: ResponderState,
}

impl PromptResponder {
    pub fn new(kind: ResponderKind) -> Self {
        Self {
            kind,
            prompt: String::new(),
            state: ResponderState::Idle,
        }
    }

    pub fn kind(&self) -> ResponderKind {
        self.kind
    }

    pub fn state(&self) -> &ResponderState {
        &self.state
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn is_submitting(&self) -> bool {
        self.state == ResponderState::Submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && !self.prompt.trim().is_empty()
    }

    /// Enters `Submitting`, clearing the previous outcome, and returns the prompt to send.
    pub fn begin_submit(&mut self) -> Result<String, SubmitRejected> {
        if self.is_submitting() {
            return Err(SubmitRejected::InFlight);
        }
        if self.prompt.trim().is_empty() {
            return Err(SubmitRejected::EmptyPrompt);
        }
        self.state = ResponderState::Submitting;
        Ok(self.prompt.clone())
    }

    pub fn finish(&mut self, result: Result<Answer, ApiError>) {
        if !self.is_submitting() {
            tracing::warn!("Ignoring a result for {:?} outside of a submission", self.kind);
            return;
        }
        self.state = match result {
            Ok(answer) => ResponderState::Success(answer),
            Err(e) => {
                tracing::error!("{:?} request failed: {}", self.kind, e);
                ResponderState::Error(self.kind.error_message().to_string())
            }
        };
    }
}

/// Runs one submission. The pane is only borrowed around the await, never across it.
pub async fn submit(
    responder: &RefCell<PromptResponder>,
    backend: &dyn GenerativeBackend,
) -> Result<(), SubmitRejected> {
    let (kind, prompt) = {
        let mut pane = responder.borrow_mut();
        let prompt = pane.begin_submit()?;
        (pane.kind(), prompt)
    };
    let result = kind.run(backend, &prompt).await;
    responder.borrow_mut().finish(result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::testing::FakeBackend;
    use crate::api::GroundedResponse;
    use std::rc::Rc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_blank_prompt_never_calls_backend() {
        let backend = FakeBackend::default();
        for kind in [ResponderKind::Complex, ResponderKind::Fast, ResponderKind::Grounded] {
            let pane = RefCell::new(PromptResponder::new(kind));
            pane.borrow_mut().set_prompt(" \t\n");
            assert_eq!(submit(&pane, &backend).await, Err(SubmitRejected::EmptyPrompt));
            assert_eq!(pane.borrow().state(), &ResponderState::Idle);
        }
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn test_resubmission_rejected_while_in_flight() {
        let mut pane = PromptResponder::new(ResponderKind::Fast);
        pane.set_prompt("Fransa'nın başkenti?");
        assert!(pane.begin_submit().is_ok());
        assert!(!pane.can_submit());
        assert_eq!(pane.begin_submit(), Err(SubmitRejected::InFlight));

        pane.finish(Ok(Answer::plain("Paris")));
        assert!(pane.can_submit());
    }

    #[tokio::test]
    async fn test_concurrent_submit_makes_one_call() {
        struct GatedBackend {
            inner: FakeBackend,
            gate: Notify,
        }

        #[async_trait::async_trait]
        impl GenerativeBackend for GatedBackend {
            fn name(&self) -> &str {
                "Gated"
            }
            async fn stream_chat(
                &self,
                history: Vec<crate::api::Turn>,
                system_instruction: Option<String>,
                text: &str,
            ) -> Result<crate::api::TextStream, ApiError> {
                self.inner.stream_chat(history, system_instruction, text).await
            }
            async fn generate(&self, prompt: &str, tier: QualityTier) -> Result<String, ApiError> {
                let result = self.inner.generate(prompt, tier).await;
                self.gate.notified().await;
                result
            }
            async fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse, ApiError> {
                self.inner.generate_grounded(prompt).await
            }
            async fn edit_image(
                &self,
                image: Vec<u8>,
                mime_type: &str,
                instruction: &str,
            ) -> Result<Option<String>, ApiError> {
                self.inner.edit_image(image, mime_type, instruction).await
            }
        }

        let backend = GatedBackend {
            inner: FakeBackend {
                text: "Paris".to_string(),
                ..Default::default()
            },
            gate: Notify::new(),
        };
        let pane = Rc::new(RefCell::new(PromptResponder::new(ResponderKind::Fast)));
        pane.borrow_mut().set_prompt("capital?");

        let first = submit(&pane, &backend);
        let second = async {
            tokio::task::yield_now().await;
            let rejected = submit(&pane, &backend).await;
            backend.gate.notify_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(SubmitRejected::InFlight));
        assert_eq!(backend.inner.calls(), 1);
        assert_eq!(
            pane.borrow().state(),
            &ResponderState::Success(Answer::plain("Paris"))
        );
    }

    #[tokio::test]
    async fn test_kinds_select_tiers() {
        let backend = FakeBackend {
            text: "ok".to_string(),
            ..Default::default()
        };
        for kind in [ResponderKind::Complex, ResponderKind::Fast] {
            let pane = RefCell::new(PromptResponder::new(kind));
            pane.borrow_mut().set_prompt("q");
            submit(&pane, &backend).await.unwrap();
        }
        assert_eq!(
            *backend.tiers.lock().unwrap(),
            vec![QualityTier::Deep, QualityTier::Fast]
        );
    }

    #[tokio::test]
    async fn test_grounded_success_carries_sources() {
        let backend = FakeBackend {
            grounded: Some(GroundedResponse {
                text: "Verstappen".to_string(),
                sources: vec![GroundingSource {
                    uri: "https://f1.example".to_string(),
                    title: String::new(),
                }],
            }),
            ..Default::default()
        };
        let pane = RefCell::new(PromptResponder::new(ResponderKind::Grounded));
        pane.borrow_mut().set_prompt("Son F1 yarışını kim kazandı?");
        submit(&pane, &backend).await.unwrap();

        match pane.borrow().state() {
            ResponderState::Success(answer) => {
                assert_eq!(answer.text, "Verstappen");
                assert_eq!(answer.sources.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("unexpected state {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_failure_maps_to_fixed_message_per_kind() {
        let backend = FakeBackend {
            fail_requests: true,
            ..Default::default()
        };
        for kind in [ResponderKind::Complex, ResponderKind::Fast, ResponderKind::Grounded] {
            let pane = RefCell::new(PromptResponder::new(kind));
            pane.borrow_mut().set_prompt("q");
            submit(&pane, &backend).await.unwrap();
            assert_eq!(
                pane.borrow().state(),
                &ResponderState::Error(kind.error_message().to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_resubmit_clears_previous_error() {
        let pane = RefCell::new(PromptResponder::new(ResponderKind::Fast));
        pane.borrow_mut().set_prompt("q");
        let failing = FakeBackend {
            fail_requests: true,
            ..Default::default()
        };
        submit(&pane, &failing).await.unwrap();
        assert!(matches!(pane.borrow().state(), ResponderState::Error(_)));

        pane.borrow_mut().begin_submit().unwrap();
        assert_eq!(pane.borrow().state(), &ResponderState::Submitting);
    }
}
