use anyhow::Context;
use clap::Parser;
use daytrader_core::notify::email::EmailNotifier;
use daytrader_core::notify::{LogNotifier, Notifier};
use daytrader_core::pipeline::{BatchRunner, EvaluationOptions, Evaluator, TickerOutcome};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "daytrader_worker")]
struct Args {
    /// Ticker to evaluate. Repeatable; defaults to every ticker in the lookup table.
    #[arg(long = "ticker")]
    tickers: Vec<String>,

    /// Free-text trading goal forwarded to the model.
    #[arg(long)]
    message: Option<String>,

    /// Run even outside the configured trading windows.
    #[arg(long)]
    force: bool,

    /// Evaluate and log only: no email, no database writes.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = daytrader_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let options = EvaluationOptions::from_env()?;
    let llm = daytrader_core::llm::client_from_settings(&settings)?;
    let provider = llm.provider().as_str();
    let evaluator = Arc::new(Evaluator::from_settings(&settings, llm, options)?);

    let now = chrono::Utc::now();
    let window = evaluator.calendar().active_window(now);
    if window.is_none() && !args.force {
        tracing::info!(
            now = %now.with_timezone(&evaluator.calendar().trading_tz),
            "outside trading windows; no action required"
        );
        return Ok(());
    }

    let tickers: Vec<String> = if args.tickers.is_empty() {
        evaluator.tickers().tickers().map(str::to_string).collect()
    } else {
        args.tickers.iter().map(|t| t.trim().to_ascii_uppercase()).collect()
    };

    let pool = match (&settings.database_url, args.dry_run) {
        (Some(db_url), false) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .context("connect DATABASE_URL failed")?;
            daytrader_core::storage::migrate(&pool).await?;
            Some(pool)
        }
        _ => None,
    };

    let window_key = window.map(|w| evaluator.calendar().window_key(now, w));
    if let (Some(pool), Some(key)) = (&pool, &window_key) {
        let acquired = daytrader_core::storage::lock::try_acquire_window_lock(pool, key).await?;
        if !acquired {
            tracing::warn!(window = %key, "trading window lock not acquired; another run in progress");
            return Ok(());
        }
    }

    let notifier: Arc<dyn Notifier> = if args.dry_run {
        Arc::new(LogNotifier)
    } else {
        Arc::new(EmailNotifier::from_settings(&settings)?)
    };

    tracing::info!(
        tickers = tickers.len(),
        window = window_key.as_deref().unwrap_or("forced"),
        dry_run = args.dry_run,
        "ticker evaluation job started"
    );
    let report = BatchRunner::new(evaluator, notifier)
        .run(&tickers, args.message.as_deref())
        .await;

    for outcome in &report.outcomes {
        if let TickerOutcome::Failed { error, .. } = outcome {
            sentry_anyhow::capture_anyhow(error);
        }
        if let Some(pool) = &pool {
            if let Err(err) =
                daytrader_core::storage::evaluations::persist_outcome(pool, report.batch_id, provider, outcome).await
            {
                tracing::error!(ticker = outcome.ticker(), error = %format!("{err:#}"), "audit write failed");
            }
        }
    }

    if let (Some(pool), Some(key)) = (&pool, &window_key) {
        let _ = daytrader_core::storage::lock::release_window_lock(pool, key).await;
    }

    tracing::info!(
        batch_id = %report.batch_id,
        failed = report.failures(),
        delivered = report.delivered(),
        "ticker evaluation job completed"
    );
    Ok(())
}

fn init_sentry(settings: &daytrader_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_flag_is_repeatable() {
        let args = Args::parse_from([
            "daytrader_worker",
            "--ticker",
            "AAPL",
            "--ticker",
            "nvda",
            "--dry-run",
        ]);
        assert_eq!(args.tickers, vec!["AAPL", "nvda"]);
        assert!(args.dry_run);
        assert!(!args.force);
        assert_eq!(args.message, None);
    }
}
