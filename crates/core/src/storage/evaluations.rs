use crate::domain::action::Proposal;
use crate::pipeline::batch::TickerOutcome;
use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Unparsed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Unparsed => "unparsed",
            RunStatus::Error => "error",
        }
    }

    pub fn of(outcome: &TickerOutcome) -> Self {
        match outcome {
            TickerOutcome::Evaluated {
                proposal: Proposal::Action(_),
                ..
            } => RunStatus::Success,
            TickerOutcome::Evaluated { .. } => RunStatus::Unparsed,
            TickerOutcome::Failed { .. } => RunStatus::Error,
        }
    }
}

/// Appends one `evaluation_runs` row for a ticker of a batch.
pub async fn persist_outcome(
    pool: &sqlx::PgPool,
    batch_id: uuid::Uuid,
    provider: &str,
    outcome: &TickerOutcome,
) -> anyhow::Result<uuid::Uuid> {
    let id = uuid::Uuid::new_v4();
    let status = RunStatus::of(outcome);

    let (proposal, context, raw, error, notified) = match outcome {
        TickerOutcome::Evaluated {
            evaluation,
            proposal,
            notify,
        } => (
            Some(proposal.label()),
            Some(evaluation.context.as_str()),
            Some(evaluation.response.as_str()),
            None,
            notify.is_delivered(),
        ),
        TickerOutcome::Failed { error, .. } => (None, None, None, Some(format!("{error:#}")), false),
    };

    sqlx::query(
        "INSERT INTO evaluation_runs \
         (id, batch_id, ticker, evaluated_at, provider, status, proposal, context, raw_llm_response, error, notified) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(id)
    .bind(batch_id)
    .bind(outcome.ticker())
    .bind(chrono::Utc::now())
    .bind(provider)
    .bind(status.as_str())
    .bind(proposal)
    .bind(context)
    .bind(raw)
    .bind(error)
    .bind(notified)
    .execute(pool)
    .await
    .with_context(|| format!("insert evaluation_runs failed (ticker={})", outcome.ticker()))?;

    Ok(id)
}
