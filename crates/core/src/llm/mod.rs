pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;
pub mod retry;

use crate::config::Settings;
use std::sync::Arc;

/// One system instruction plus one user-role message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Overrides the client's default model.
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Some(Provider::Anthropic),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Returns the model's reply text, unparsed.
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String>;
}

/// Builds the configured provider wrapped in the transient-error retry policy.
pub fn client_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    let provider = match settings.llm_provider.as_deref() {
        None => Provider::OpenAI,
        Some(s) => Provider::parse(s)
            .ok_or_else(|| anyhow::anyhow!("LLM_PROVIDER must be openai or anthropic (got {s})"))?,
    };

    let policy = retry::RetryPolicy::from_env();
    let client: Arc<dyn LlmClient> = match provider {
        Provider::OpenAI => Arc::new(retry::RetryingClient::new(
            openai::OpenAiClient::from_settings(settings)?,
            policy,
        )),
        Provider::Anthropic => Arc::new(retry::RetryingClient::new(
            anthropic::AnthropicClient::from_settings(settings)?,
            policy,
        )),
    };
    tracing::info!(provider = provider.as_str(), "LLM client ready");
    Ok(client)
}
