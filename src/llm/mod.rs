//! Language-model completions.
//!
//! The tutor only needs "prompt in, text out", so providers implement a
//! single async method. Everything that interprets the text lives in
//! [`tutor`] on top of the normalizer.

pub mod gemini;
pub mod prompts;
pub mod tutor;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::LlmSettings;
use crate::normalizer::NormalizeError;

pub use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM provider is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Completion was empty")]
    EmptyResponse,

    #[error("Could not read completion: {0}")]
    Normalize(#[from] NormalizeError),
}

/// Text completion backend
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider identifier for logs
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Stand-in used when no API key is configured. Every call fails, so
/// features that can degrade (answer grading) fall back locally.
pub struct UnconfiguredProvider;

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// Build the provider described by the settings
pub fn provider_from_settings(settings: &LlmSettings) -> Result<Arc<dyn CompletionProvider>, LlmError> {
    match &settings.api_key {
        Some(key) if !key.trim().is_empty() => {
            let client = GeminiClient::new(key.clone(), settings.model.clone(), settings.base_url.clone())?;
            tracing::info!("Using Gemini model {}", settings.model);
            Ok(Arc::new(client))
        }
        _ => {
            tracing::warn!("GEMINI_API_KEY not set; generation endpoints will return errors");
            Ok(Arc::new(UnconfiguredProvider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_provider_fails() {
        let provider = UnconfiguredProvider;
        assert!(matches!(provider.complete("hi").await, Err(LlmError::NotConfigured)));
    }

    #[test]
    fn test_provider_from_settings() {
        let mut settings = LlmSettings {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "http://localhost:9".to_string(),
        };
        assert_eq!(provider_from_settings(&settings).unwrap().name(), "unconfigured");

        settings.api_key = Some("key".to_string());
        assert_eq!(provider_from_settings(&settings).unwrap().name(), "gemini");
    }
}
