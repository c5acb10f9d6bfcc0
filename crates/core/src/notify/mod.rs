pub mod email;
pub mod format;

use crate::domain::action::Proposal;
use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt;

/// One message per evaluated ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub ticker: String,
    /// `buy` / `sell` / `hold`, or `unknown` when the reply did not parse.
    pub proposal: String,
    pub subject: String,
    pub body_markdown: String,
}

impl Notification {
    pub fn compose(ticker: &str, proposal: &Proposal, context: &str, now: DateTime<Tz>) -> Self {
        Self {
            ticker: ticker.to_string(),
            proposal: proposal.label().to_string(),
            subject: format::subject(ticker, proposal, now),
            body_markdown: format::body(&format::format_proposal(proposal), context),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    /// Delivery deliberately not attempted (dry run).
    Skipped,
    Failed { reason: String },
}

impl NotifyOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, NotifyOutcome::Delivered)
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Delivered => write!(f, "delivered"),
            NotifyOutcome::Skipped => write!(f, "skipped"),
            NotifyOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Single delivery attempt. Failures come back as `NotifyOutcome::Failed`,
/// never as an error.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> NotifyOutcome;
}

/// Logs the message instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyOutcome {
        tracing::info!(
            ticker = %notification.ticker,
            proposal = %notification.proposal,
            subject = %notification.subject,
            body_len = notification.body_markdown.len(),
            "dry run: notification not sent"
        );
        NotifyOutcome::Skipped
    }
}
