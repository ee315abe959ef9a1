use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::error::{FusionError, FusionResult};
use crate::services::pipeline::{AnalysisPipeline, AnalysisRequest};
use crate::services::regime::RegimeClassifier;
use crate::services::reporting::render_report;
use crate::services::signal::SignalDecisionEngine;
use crate::types::{MacroIndicatorSet, MarketContext, Regime, RegimeClassification, SentimentAssessment};

const DEFAULT_PAGE: usize = 50;

pub struct AppState {
    pub pipeline: AnalysisPipeline,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FusionError> for ApiError {
    fn from(e: FusionError) -> Self {
        if e.is_invalid_input() {
            ApiError::BadRequest(e.to_string())
        } else {
            error!("❌ [API] {}", e);
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/regime/classify", post(classify_regime))
        .route("/signals", post(generate_signal))
        .route("/signals/summary", get(signal_summary))
        .route("/signals/{ticker}", get(signal_history))
        .route("/signals/{ticker}/report", get(signal_report))
        .route("/analyze", post(analyze))
        .route("/alerts", get(alert_history))
        .route("/alerts/stats", get(alert_stats))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>, addr: &str) -> FusionResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| FusionError::Config(format!("failed to bind {}: {}", addr, e)))?;
    info!("🌐 [API] Listening on {}", addr);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| FusionError::Config(format!("server error: {}", e)))
}

async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let regime = state.pipeline.monitor().current_regime().await?;
    Ok(Json(json!({
        "status": "ok",
        "regime": regime.map(|r| r.regime),
        "signals_recorded": state.pipeline.reporter().len(),
    })))
}

async fn classify_regime(Json(indicators): Json<MacroIndicatorSet>) -> ApiResult<Json<serde_json::Value>> {
    let classifier = RegimeClassifier::new();
    let classification = classifier.classify(&indicators)?;
    let recommendation = classifier.recommend(&classification)?;
    Ok(Json(json!({
        "classification": classification,
        "recommendation": recommendation,
    })))
}

#[derive(Debug, Deserialize)]
struct SignalRequest {
    ticker: String,
    sentiment: SentimentAssessment,
    regime: Regime,
    regime_confidence: f64,
    #[serde(default)]
    context: Option<MarketContext>,
}

async fn generate_signal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignalRequest>,
) -> ApiResult<impl IntoResponse> {
    let regime = RegimeClassification::from_parts(req.regime, req.regime_confidence)?;
    let signal = SignalDecisionEngine::new().generate_signal(
        &req.ticker,
        &req.sentiment,
        &regime,
        req.context.as_ref(),
    )?;
    state.pipeline.reporter().record(&signal);
    Ok(Json(signal))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    limit: Option<usize>,
    ticker: Option<String>,
}

async fn signal_history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE);
    Json(state.pipeline.reporter().history(&ticker, limit))
}

async fn signal_summary(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.reporter().summary())
}

#[derive(Debug, Deserialize)]
struct ReportParams {
    company: Option<String>,
}

/// Plain-text thesis for the latest signal on `ticker`.
async fn signal_report(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(params): Query<ReportParams>,
) -> ApiResult<String> {
    let latest = state
        .pipeline
        .reporter()
        .history(&ticker, 1)
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("no signals recorded for {}", ticker.trim().to_uppercase())))?;
    Ok(render_report(&latest, params.company.as_deref()))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalysisRequest>,
) -> ApiResult<impl IntoResponse> {
    let report = state.pipeline.analyze(&req).await?;
    Ok(Json(report))
}

async fn alert_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE);
    let history = state
        .pipeline
        .monitor()
        .history(limit, params.ticker.as_deref())
        .await?;
    Ok(Json(history))
}

async fn alert_stats(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let stats = state.pipeline.monitor().stats().await?;
    Ok(Json(stats))
}
