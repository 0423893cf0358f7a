use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ndsom_core::AppError;
use ndsom_core::models::MarketRow;

use crate::dto::{
    DailyTotalResponse, HealthResponse, MarketHistoryResponse, MarketRowResponse,
    SecurityListResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/securities", get(list_securities))
        .route("/v1/securities/{security}/rows", get(security_rows))
        .route("/v1/securities/{security}/daily", get(security_daily))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

/// All rows of `security`, or `NotFoundError` if none were ever stored.
async fn load_history(state: &AppState, security: &str) -> Result<Vec<MarketRow>, AppError> {
    let rows = state.db.market_repo().history(security).await?;
    if rows.is_empty() {
        return Err(AppError::NotFoundError(format!(
            "No rows stored for security '{security}'"
        )));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/v1/securities",
    responses(
        (status = 200, description = "Distinct securities, sorted", body = SecurityListResponse),
    ),
    tag = "market"
)]
pub async fn list_securities(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let securities = state.db.market_repo().security_descriptions().await?;
    let total = securities.len();

    Ok(axum::Json(SecurityListResponse { securities, total }))
}

#[utoipa::path(
    get,
    path = "/v1/securities/{security}/rows",
    params(("security" = String, Path, description = "Security description")),
    responses(
        (status = 200, description = "Stored rows, oldest first", body = MarketHistoryResponse),
        (status = 404, description = "Unknown security", body = crate::dto::ErrorResponse),
    ),
    tag = "market"
)]
pub async fn security_rows(
    State(state): State<Arc<AppState>>,
    Path(security): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = load_history(&state, &security).await?;
    let total = rows.len();

    Ok(axum::Json(MarketHistoryResponse {
        security,
        rows: rows.into_iter().map(MarketRowResponse::from).collect(),
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/securities/{security}/daily",
    params(("security" = String, Path, description = "Security description")),
    responses(
        (status = 200, description = "Per-day totals of trades and TTA", body = [DailyTotalResponse]),
        (status = 404, description = "Unknown security", body = crate::dto::ErrorResponse),
    ),
    tag = "market"
)]
pub async fn security_daily(
    State(state): State<Arc<AppState>>,
    Path(security): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = load_history(&state, &security).await?;
    let totals: Vec<DailyTotalResponse> = state
        .calendar
        .daily_totals(&rows)
        .into_iter()
        .map(DailyTotalResponse::from)
        .collect();

    Ok(axum::Json(totals))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = state.db.market_repo().health_check().await.is_ok();

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        database: if healthy { "ok" } else { "error" },
    };

    (status, axum::Json(response))
}
