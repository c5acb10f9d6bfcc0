use crate::llm::Provider;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl LlmDiagnosticsError {
    /// Transport failures, throttling and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self.status {
            Some(status) => status == 429 || (500..=599).contains(&status),
            None => self.stage == "request",
        }
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={:?}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

pub fn is_transient(err: &anyhow::Error) -> bool {
    err.downcast_ref::<LlmDiagnosticsError>()
        .map(LlmDiagnosticsError::is_transient)
        .unwrap_or(false)
}
