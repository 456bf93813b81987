use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use newscorr_core::domain::report::CorrelationReport;
use newscorr_core::error::AnalysisError;
use newscorr_core::ingest::types::{news_table, price_table, NewsRecord, PriceRecord};
use newscorr_core::pipeline::{self, PipelineConfig};
use newscorr_core::storage::reports;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = newscorr_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(e) = settings.ensure_data_dirs() {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "data dir not writable; reports will not be persisted");
    }

    let state = AppState {
        reports_dir: settings.reports_dir(),
        news_tz: settings.news_tz_offset,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/correlate", post(post_correlate))
        .route("/reports/latest", get(get_latest_report))
        .route("/reports/:run_id", get(get_report_by_id))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    reports_dir: PathBuf,
    news_tz: Option<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct CorrelateRequest {
    news: Vec<NewsRecord>,
    prices: Vec<PriceRecord>,
    #[serde(default)]
    config: PipelineConfig,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn api_error(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: error.into(),
        }),
    )
}

fn internal(err: anyhow::Error) -> (StatusCode, Json<ApiError>) {
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %err, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

/// Schema problems are the caller's request; degenerate data is well-formed but unusable.
fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<AnalysisError>() {
        Some(e) if e.is_request_error() => StatusCode::BAD_REQUEST,
        Some(e) if e.is_data_error() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Runs file and CPU work off the async workers.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ApiResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| internal(anyhow::Error::from(e).context("blocking task failed")))?
}

async fn post_correlate(
    State(state): State<AppState>,
    Json(req): Json<CorrelateRequest>,
) -> ApiResult<CorrelationReport> {
    blocking(move || correlate(&state, req)).await
}

fn correlate(state: &AppState, req: CorrelateRequest) -> ApiResult<CorrelationReport> {
    let cfg = req.config;

    let outcome = news_table(&req.news, &cfg.sentiment, state.news_tz)
        .and_then(|news| Ok((news, price_table(&req.prices, &cfg.returns)?)))
        .map_err(anyhow::Error::from)
        .and_then(|(news, prices)| pipeline::run(&news, &prices, &cfg));

    match outcome {
        Ok(out) => {
            reports::persist_success(&state.reports_dir, &out.report).map_err(internal)?;
            tracing::info!(run_id = %out.report.run_id, "correlation report stored");
            Ok(Json(out.report))
        }
        Err(err) => {
            let status = status_for(&err);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                return Err(internal(err));
            }
            let run_id = reports::persist_failure(&state.reports_dir, cfg.instrument.clone(), &err)
                .map_err(internal)?;
            tracing::warn!(%run_id, %status, error = %err, "correlation request rejected");
            Err(api_error(status, format!("{err:#}")))
        }
    }
}

async fn get_latest_report(State(state): State<AppState>) -> ApiResult<CorrelationReport> {
    blocking(move || {
        let report = reports::fetch_latest(&state.reports_dir)
            .map_err(internal)?
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no successful report yet"))?;
        Ok(Json(report))
    })
    .await
}

async fn get_report_by_id(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<CorrelationReport> {
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "run_id must be a uuid"))?;

    blocking(move || {
        let report = reports::fetch_by_id(&state.reports_dir, run_id)
            .map_err(internal)?
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("report {run_id} not found")))?;
        Ok(Json(report))
    })
    .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &newscorr_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
