use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use daytrader_core::notify::email::EmailNotifier;
use daytrader_core::notify::Notifier;
use daytrader_core::pipeline::{BatchRunner, EvaluationOptions, Evaluator, TickerOutcome};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod session;

use session::{SessionError, SessionStore};

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

    let (admin_name, admin_password) = settings.require_admin()?;
    let sessions = Arc::new(SessionStore::new(admin_name, admin_password));

    let options = EvaluationOptions::from_env()?;
    let llm = daytrader_core::llm::client_from_settings(&settings)?;
    let provider = llm.provider().as_str();
    let evaluator = Arc::new(Evaluator::from_settings(&settings, llm, options)?);
    let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::from_settings(&settings)?);

    let pool: Option<PgPool> = match settings.database_url.as_deref() {
        Some(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match daytrader_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; audit log disabled");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; audit log disabled");
                None
            }
        },
        None => {
            tracing::info!("DATABASE_URL not set; audit log disabled");
            None
        }
    };

    let state = AppState {
        evaluator,
        notifier,
        sessions,
        pool,
        provider,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/tickers", get(list_tickers))
        .route("/evaluations", post(submit_evaluations))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    evaluator: Arc<Evaluator>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<SessionStore>,
    pool: Option<PgPool>,
    provider: &'static str,
}

fn status_for(err: SessionError) -> StatusCode {
    match err {
        SessionError::InvalidCredentials | SessionError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        SessionError::AlreadyEvaluating => StatusCode::CONFLICT,
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
    }
}

fn bearer_session(headers: &HeaderMap) -> Result<Uuid, StatusCode> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .ok_or(StatusCode::UNAUTHORIZED)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    session_id: Uuid,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let session_id = state
        .sessions
        .login(&req.username, &req.password)
        .await
        .map_err(|e| {
            tracing::warn!(username = %req.username, error = %e, "login rejected");
            status_for(e)
        })?;
    Ok(Json(LoginResponse { session_id }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Ok(id) = bearer_session(&headers) {
        state.sessions.logout(id).await;
    }
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
struct ApiTicker {
    ticker: String,
    company_name: String,
}

async fn list_tickers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ApiTicker>>, StatusCode> {
    let id = bearer_session(&headers)?;
    state.sessions.require_authenticated(id).await.map_err(status_for)?;

    let table = state.evaluator.tickers();
    let out = table
        .tickers()
        .filter_map(|t| {
            table.company_name(t).ok().map(|name| ApiTicker {
                ticker: t.to_string(),
                company_name: name.to_string(),
            })
        })
        .collect();
    Ok(Json(out))
}

#[derive(Debug, Deserialize)]
struct EvaluationRequest {
    tickers: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiOutcome {
    ticker: String,
    status: &'static str,
    proposal: Option<&'static str>,
    response: Option<String>,
    notification: Option<String>,
    error: Option<String>,
}

impl From<&TickerOutcome> for ApiOutcome {
    fn from(outcome: &TickerOutcome) -> Self {
        match outcome {
            TickerOutcome::Evaluated {
                evaluation,
                proposal,
                notify,
            } => ApiOutcome {
                ticker: evaluation.ticker.clone(),
                status: "evaluated",
                proposal: Some(proposal.label()),
                response: Some(evaluation.response.clone()),
                notification: Some(notify.to_string()),
                error: None,
            },
            TickerOutcome::Failed { ticker, error } => ApiOutcome {
                ticker: ticker.clone(),
                status: "failed",
                proposal: None,
                response: None,
                notification: None,
                error: Some(format!("{error:#}")),
            },
        }
    }
}

async fn submit_evaluations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EvaluationRequest>,
) -> Result<Json<Vec<ApiOutcome>>, StatusCode> {
    let id = bearer_session(&headers)?;
    state.sessions.require_authenticated(id).await.map_err(status_for)?;

    let tickers: Vec<String> = req
        .tickers
        .iter()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if tickers.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Dropping the guard (client disconnect) releases the session.
    let guard = state.sessions.begin_evaluation(id).map_err(status_for)?;

    let runner = BatchRunner::new(state.evaluator.clone(), state.notifier.clone());
    let report = runner.run(&tickers, req.message.as_deref()).await;

    for outcome in &report.outcomes {
        if let TickerOutcome::Failed { error, .. } = outcome {
            sentry_anyhow::capture_anyhow(error);
        }
        if let Some(pool) = &state.pool {
            if let Err(err) = daytrader_core::storage::evaluations::persist_outcome(
                pool,
                report.batch_id,
                state.provider,
                outcome,
            )
            .await
            {
                tracing::error!(ticker = outcome.ticker(), error = %format!("{err:#}"), "audit write failed");
            }
        }
    }

    guard.finish();

    Ok(Json(report.outcomes.iter().map(ApiOutcome::from).collect()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
    use axum::http::HeaderValue;

    #[test]
    fn bearer_session_parses_uuid() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {id}")).unwrap(),
        );
        assert_eq!(bearer_session(&headers), Ok(id));
    }

    #[test]
    fn missing_or_malformed_bearer_is_unauthorized() {
        assert_eq!(bearer_session(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_session(&headers), Err(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn concurrent_submission_maps_to_conflict() {
        assert_eq!(status_for(SessionError::AlreadyEvaluating), StatusCode::CONFLICT);
        assert_eq!(status_for(SessionError::NotAuthenticated), StatusCode::UNAUTHORIZED);
    }
}
