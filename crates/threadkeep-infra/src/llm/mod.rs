//! Remote model provider implementations.
//!
//! Contains the concrete [`LlmProvider`](threadkeep_core::llm::provider::LlmProvider)
//! for Gemini and the factory that wraps it for runtime use.

pub mod gemini;

use threadkeep_core::llm::box_provider::BoxLlmProvider;
use threadkeep_types::config::ModelConfig;
use threadkeep_types::llm::LlmError;

use self::gemini::GeminiProvider;

/// Build the configured provider.
///
/// A missing API key is logged rather than rejected; chat requests then
/// fail with `LlmError::NotConfigured` while history endpoints keep working.
pub fn create_provider(config: &ModelConfig) -> Result<BoxLlmProvider, LlmError> {
    let provider = GeminiProvider::new(config)?;
    if !provider.is_configured() {
        tracing::warn!("No Gemini API key configured (set GOOGLE_API_KEY); chat requests will fail");
    }
    tracing::info!(model = %provider.model(), "Gemini provider ready");
    Ok(BoxLlmProvider::new(provider))
}
