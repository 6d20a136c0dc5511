//! Test fixtures shared by the router, tool-server and CLI tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use threadkeep_core::clock::{SharedClock, SystemClock};
use threadkeep_core::llm::box_provider::BoxLlmProvider;
use threadkeep_core::llm::provider::LlmProvider;
use threadkeep_infra::storage::{AnyTranscriptBackend, InMemoryTranscriptBackend};
use threadkeep_types::config::{AppConfig, StorageBackendKind};
use threadkeep_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use crate::state::AppState;

/// Replies `"reply #{n}"` where n is the number of turns it was sent.
///
/// Clones share the failure switch, so a test keeps one handle while the
/// service owns another.
#[derive(Clone, Default)]
pub struct StubProvider {
    failing: Arc<AtomicBool>,
}

impl StubProvider {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::Provider {
                message: "stub failure".to_string(),
            });
        }
        Ok(CompletionResponse {
            content: format!("reply #{}", request.messages.len()),
            model: request.model.clone(),
            finish_reason: None,
            usage: Usage::default(),
        })
    }
}

/// State over an in-memory backend and a stub provider.
pub fn test_state() -> (AppState, StubProvider) {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackendKind::Memory;
    config.server.platform = "test".to_string();

    let clock: SharedClock = Arc::new(SystemClock);
    let provider = StubProvider::default();
    let state = AppState::from_parts(
        config,
        AnyTranscriptBackend::Memory(InMemoryTranscriptBackend::new(clock.clone())),
        BoxLlmProvider::new(provider.clone()),
        clock,
    );
    (state, provider)
}
