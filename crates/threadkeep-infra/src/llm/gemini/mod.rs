//! Google Gemini provider (`generateContent`, non-streaming).

pub mod client;
pub mod types;

pub use client::GeminiProvider;
