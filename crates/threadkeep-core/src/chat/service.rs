//! Chat service: one request in, one reply out, with conversation memory.
//!
//! For a request carrying a session, `ChatService` loads the transcript,
//! replays it to the model together with the new prompt, then stores the
//! user turn and the model turn as one exchange and slides the session's
//! deadline. Requests without a session are answered statelessly.
//!
//! Failure policy:
//! - a failed model call persists nothing;
//! - a store failure either fails the request or degrades to a stateless
//!   answer, depending on [`StorageErrorPolicy`];
//! - a failed deadline refresh after a stored exchange is only logged, since
//!   the append already reset the deadline.

use std::sync::Arc;
use std::time::Duration;

use threadkeep_types::chat::{ChatReply, MemoryMode, SessionKey, Turn};
use threadkeep_types::config::{ChatConfig, ModelConfig, StorageErrorPolicy};
use threadkeep_types::error::{ChatError, StoreError};
use threadkeep_types::llm::{CompletionRequest, LlmError};
use tracing::{debug, info, warn};

use crate::conversation::locks::SessionLocks;
use crate::conversation::store::ConversationStore;
use crate::llm::box_provider::BoxLlmProvider;
use crate::storage::transcript_backend::TranscriptBackend;

/// Knobs the chat service reads on every request.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
    pub model_timeout: Duration,
    pub serialize_sessions: bool,
    pub on_storage_error: StorageErrorPolicy,
}

impl ChatSettings {
    pub fn from_config(model: &ModelConfig, chat: &ChatConfig) -> Self {
        Self {
            model: model.model.clone(),
            system_prompt: model.system_prompt.clone(),
            temperature: model.temperature,
            max_output_tokens: model.max_output_tokens,
            model_timeout: model.timeout(),
            serialize_sessions: chat.serialize_sessions,
            on_storage_error: chat.on_storage_error,
        }
    }
}

/// Answers prompts, replaying and recording per-session history.
///
/// Generic over `TranscriptBackend` so threadkeep-core never depends on
/// threadkeep-infra.
pub struct ChatService<B: TranscriptBackend> {
    store: Arc<ConversationStore<B>>,
    provider: BoxLlmProvider,
    locks: SessionLocks,
    settings: ChatSettings,
}

impl<B: TranscriptBackend> ChatService<B> {
    pub fn new(store: Arc<ConversationStore<B>>, provider: BoxLlmProvider, settings: ChatSettings) -> Self {
        Self {
            store,
            provider,
            locks: SessionLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore<B>> {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer one prompt.
    ///
    /// With `session` set, prior turns are replayed and the exchange is
    /// persisted; without it nothing is read or written.
    pub async fn chat(&self, session: Option<&SessionKey>, text: &str) -> Result<ChatReply, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        let Some(key) = session else {
            let answer = self.ask(Vec::new(), text).await?;
            return Ok(ChatReply {
                text: answer,
                memory: MemoryMode::Stateless,
                history_len: 0,
            });
        };

        let _guard = if self.settings.serialize_sessions {
            Some(self.locks.acquire(key).await)
        } else {
            None
        };

        let history = match self.store.load(key).await {
            Ok(history) => history,
            Err(e) => {
                self.tolerate(key, "load", e)?;
                let answer = self.ask(Vec::new(), text).await?;
                return Ok(ChatReply {
                    text: answer,
                    memory: MemoryMode::Degraded,
                    history_len: 0,
                });
            }
        };

        let history_len = history.len();
        let answer = self.ask(history, text).await?;

        if let Err(e) = self.store.append_exchange(key, text, &answer).await {
            self.tolerate(key, "append_exchange", e)?;
            return Ok(ChatReply {
                text: answer,
                memory: MemoryMode::Degraded,
                history_len,
            });
        }

        if let Err(e) = self.store.refresh_expiry(key, self.store.ttl()).await {
            warn!(session = %key, error = %e, "Failed to refresh session expiry");
        }

        info!(session = %key, history_len, "Chat exchange stored");
        Ok(ChatReply {
            text: answer,
            memory: MemoryMode::Used,
            history_len,
        })
    }

    /// Stored transcript for a session.
    pub async fn history(&self, key: &SessionKey) -> Result<Vec<Turn>, StoreError> {
        self.store.load(key).await
    }

    /// Drop a session's transcript. Returns whether one existed.
    pub async fn forget(&self, key: &SessionKey) -> Result<bool, StoreError> {
        let _guard = self.locks.acquire(key).await;
        self.store.delete(key).await
    }

    /// Apply the storage error policy: `Ok` means carry on without memory.
    fn tolerate(&self, key: &SessionKey, op: &str, err: StoreError) -> Result<(), ChatError> {
        match self.settings.on_storage_error {
            StorageErrorPolicy::Fail => Err(err.into()),
            StorageErrorPolicy::Degrade => {
                warn!(session = %key, op, error = %err, "Store failed, answering without memory");
                Ok(())
            }
        }
    }

    async fn ask(&self, mut messages: Vec<Turn>, text: &str) -> Result<String, LlmError> {
        messages.push(Turn::user(text));
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            system: self.settings.system_prompt.clone(),
            max_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        };

        let timeout = self.settings.model_timeout;
        let response = tokio::time::timeout(timeout, self.provider.complete(&request))
            .await
            .map_err(|_| LlmError::Timeout(timeout))??;

        debug!(
            provider = self.provider.name(),
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Model replied"
        );
        Ok(response.content)
    }
}
