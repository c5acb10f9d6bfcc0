use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{CompletionRequest, LlmClient, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "chatgpt-4o-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat Completions client (also serves OpenAI-compatible endpoints).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn diagnostics(stage: &'static str, status: Option<u16>, detail: String, raw: Option<String>) -> LlmDiagnosticsError {
        LlmDiagnosticsError {
            provider: Provider::OpenAI,
            stage,
            status,
            detail,
            raw_output: raw,
        }
    }

    fn response_text(res: ChatCompletionResponse) -> anyhow::Result<String> {
        res.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                Self::diagnostics("decode", None, "response has no message content".to_string(), None)
                    .into()
            })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAI
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<String> {
        let body = ChatCompletionRequest {
            model: req.model.unwrap_or_else(|| self.model.clone()),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: req.system,
                },
                ChatMessage {
                    role: "user",
                    content: req.user,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let t0 = std::time::Instant::now();
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::diagnostics("request", None, e.to_string(), None))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| Self::diagnostics("request", None, e.to_string(), None))?;
        if !status.is_success() {
            return Err(Self::diagnostics(
                "http",
                Some(status.as_u16()),
                format!("status={status}"),
                Some(text),
            )
            .into());
        }

        let parsed = serde_json::from_str::<ChatCompletionResponse>(&text).map_err(|e| {
            Self::diagnostics("decode", None, e.to_string(), Some(text.clone()))
        })?;
        tracing::debug!(model = %body.model, elapsed_ms = t0.elapsed().as_millis(), "OpenAI completion");
        Self::response_text(parsed)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
