//! Application state wiring the store, provider and chat service together.
//!
//! `ChatService` is generic over the transcript backend; `AppState` pins it
//! to the backend selected by configuration.

use std::sync::Arc;

use threadkeep_core::chat::service::{ChatService, ChatSettings};
use threadkeep_core::clock::{SharedClock, SystemClock};
use threadkeep_core::conversation::store::ConversationStore;
use threadkeep_core::llm::box_provider::BoxLlmProvider;
use threadkeep_infra::llm::create_provider;
use threadkeep_infra::storage::AnyTranscriptBackend;
use threadkeep_types::config::AppConfig;

/// Chat service pinned to the runtime-selected backend.
pub type ConcreteChatService = ChatService<AnyTranscriptBackend>;

/// Shared state used by CLI commands, HTTP handlers and the tool server.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Open the configured backend and build the provider.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let clock: SharedClock = Arc::new(SystemClock);
        let backend = AnyTranscriptBackend::open(&config.storage, clock.clone()).await?;
        let provider = create_provider(&config.model)?;
        Ok(Self::from_parts(config, backend, provider, clock))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        config: AppConfig,
        backend: AnyTranscriptBackend,
        provider: BoxLlmProvider,
        clock: SharedClock,
    ) -> Self {
        let store = Arc::new(ConversationStore::new(backend, clock, &config.storage));
        let settings = ChatSettings::from_config(&config.model, &config.chat);
        let chat_service = Arc::new(ChatService::new(store, provider, settings));

        Self {
            chat_service,
            config: Arc::new(config),
        }
    }

    /// Release backend resources before exit.
    pub async fn close(&self) {
        self.chat_service.store().backend().close().await;
    }
}
