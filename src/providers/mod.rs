//! LLM provider seam.
//!
//! Everything that talks to a hosted model goes through [`Provider`], so the
//! agents can be tested with in-memory doubles and the backend can be swapped
//! by configuration.

mod compatible;

pub use compatible::OpenAiCompatibleProvider;

use crate::config::ProviderConfig;
use async_trait::async_trait;

#[async_trait]
pub trait Provider: Send + Sync {
    /// One blocking-style chat call: system prompt plus a single user turn,
    /// returning the model's text answer.
    async fn chat(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

/// Builds the configured provider. Only the OpenAI-compatible surface is
/// supported; most hosted APIs speak it.
pub fn create_provider(config: &ProviderConfig) -> Box<dyn Provider> {
    Box::new(OpenAiCompatibleProvider::new(
        &config.base_url,
        config.api_key.as_deref(),
        &config.model,
        config.temperature,
    ))
}
