//! Remote model port.
//!
//! The chat service only needs "send these turns, get one reply back".
//! Implementations live in threadkeep-infra (e.g. `GeminiProvider`).

use threadkeep_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// A remote text-generation model.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition); wrap in
/// [`BoxLlmProvider`](super::box_provider::BoxLlmProvider) for dynamic
/// dispatch.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Send the conversation and receive the full reply.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
