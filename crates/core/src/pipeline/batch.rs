use crate::domain::action::Proposal;
use crate::llm::json::parse_response;
use crate::notify::{Notification, Notifier, NotifyOutcome};
use crate::pipeline::evaluator::{Evaluation, Evaluator};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub enum TickerOutcome {
    Evaluated {
        evaluation: Evaluation,
        proposal: Proposal,
        notify: NotifyOutcome,
    },
    Failed {
        ticker: String,
        error: anyhow::Error,
    },
}

impl TickerOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            TickerOutcome::Evaluated { evaluation, .. } => &evaluation.ticker,
            TickerOutcome::Failed { ticker, .. } => ticker,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TickerOutcome::Failed { .. })
    }
}

pub struct BatchReport {
    pub batch_id: uuid::Uuid,
    pub outcomes: Vec<TickerOutcome>,
}

impl BatchReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TickerOutcome::Evaluated { notify, .. } if notify.is_delivered()))
            .count()
    }
}

/// Evaluates tickers one after another with a fixed pause in between. A
/// failing ticker is recorded and the batch moves on.
pub struct BatchRunner {
    evaluator: Arc<Evaluator>,
    notifier: Arc<dyn Notifier>,
    delay: Duration,
}

impl BatchRunner {
    pub fn new(evaluator: Arc<Evaluator>, notifier: Arc<dyn Notifier>) -> Self {
        let delay = evaluator.options().batch_delay;
        Self {
            evaluator,
            notifier,
            delay,
        }
    }

    pub async fn run(&self, tickers: &[String], directive: Option<&str>) -> BatchReport {
        let batch_id = uuid::Uuid::new_v4();
        tracing::info!(%batch_id, tickers = tickers.len(), "batch started");

        let mut outcomes = Vec::with_capacity(tickers.len());
        for (idx, ticker) in tickers.iter().enumerate() {
            if idx > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            outcomes.push(self.run_one(ticker, directive).await);
        }

        let report = BatchReport { batch_id, outcomes };
        tracing::info!(
            %batch_id,
            evaluated = report.outcomes.len() - report.failures(),
            failed = report.failures(),
            delivered = report.delivered(),
            "batch finished"
        );
        report
    }

    async fn run_one(&self, ticker: &str, directive: Option<&str>) -> TickerOutcome {
        let evaluation = match self.evaluator.evaluate(ticker, directive).await {
            Ok(evaluation) => evaluation,
            Err(error) => {
                tracing::error!(ticker, error = %format!("{error:#}"), "evaluation failed");
                return TickerOutcome::Failed {
                    ticker: ticker.to_string(),
                    error,
                };
            }
        };

        let proposal = parse_response(&evaluation.response);
        let now = Utc::now().with_timezone(&self.evaluator.calendar().trading_tz);
        let notification = Notification::compose(ticker, &proposal, &evaluation.context, now);
        let notify = self.notifier.notify(&notification).await;
        match &notify {
            NotifyOutcome::Failed { reason } => {
                tracing::warn!(ticker, proposal = proposal.label(), reason = %reason, "notification failed")
            }
            _ => tracing::info!(ticker, proposal = proposal.label(), outcome = %notify, "ticker done"),
        }

        TickerOutcome::Evaluated {
            evaluation,
            proposal,
            notify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::options::EvaluationOptions;
    use crate::pipeline::testing::{fixture, FakeLlm, RecordingNotifier};

    fn options() -> EvaluationOptions {
        EvaluationOptions {
            summarize_sections: false,
            batch_delay: Duration::ZERO,
            ..EvaluationOptions::default()
        }
    }

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn sell_reply_is_notified_once_with_amount() {
        let fx = fixture(FakeLlm::replying(
            "Decision below.\n```json\n{\"action\":\"sell\",\"position_type\":\"long\",\"amount\":\"500\",\"look_back_in_seconds\":1200,\"reason_of_decision\":\"Momentum is fading.\"}\n```",
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = BatchRunner::new(Arc::new(fx.evaluator(options())), notifier.clone());

        let report = runner.run(&tickers(&["AAPL"]), None).await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ticker, "AAPL");
        assert_eq!(sent[0].proposal, "sell");
        assert!(sent[0].body_markdown.contains("500"));
        assert_eq!(report.delivered(), 1);
    }

    #[tokio::test]
    async fn one_failing_ticker_does_not_stop_the_batch() {
        let fx = fixture(FakeLlm::replying(
            "```json\n{\"action\":\"hold\",\"look_back_in_seconds\":1800,\"reason_of_decision\":\"Wait.\"}\n```",
        ));
        fx.market.fail_for("MSFT");
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = BatchRunner::new(Arc::new(fx.evaluator(options())), notifier.clone());

        let report = runner.run(&tickers(&["AAPL", "MSFT", "NVDA"]), None).await;

        let notified: Vec<_> = notifier.sent().into_iter().map(|n| n.ticker).collect();
        assert_eq!(notified, vec!["AAPL", "NVDA"]);
        assert_eq!(report.failures(), 1);
        assert!(report.outcomes[1].is_failed());
        assert_eq!(report.outcomes[1].ticker(), "MSFT");
    }

    #[tokio::test]
    async fn malformed_reply_is_still_notified_as_unknown() {
        let fx = fixture(FakeLlm::replying("I cannot decide today."));
        let notifier = Arc::new(RecordingNotifier::default());
        let runner = BatchRunner::new(Arc::new(fx.evaluator(options())), notifier.clone());

        runner.run(&tickers(&["AAPL"]), None).await;

        let sent = notifier.sent();
        assert_eq!(sent[0].proposal, "unknown");
        assert!(sent[0].body_markdown.starts_with("I cannot decide today."));
    }

    #[tokio::test]
    async fn notification_failure_is_reported_not_raised() {
        let fx = fixture(FakeLlm::replying("no json"));
        let notifier = Arc::new(RecordingNotifier::failing("smtp down"));
        let runner = BatchRunner::new(Arc::new(fx.evaluator(options())), notifier.clone());

        let report = runner.run(&tickers(&["AAPL", "NVDA"]), None).await;

        assert_eq!(notifier.sent().len(), 2);
        assert_eq!(report.failures(), 0);
        assert_eq!(report.delivered(), 0);
        assert!(matches!(
            &report.outcomes[0],
            TickerOutcome::Evaluated { notify: NotifyOutcome::Failed { reason }, .. } if reason == "smtp down"
        ));
    }
}
