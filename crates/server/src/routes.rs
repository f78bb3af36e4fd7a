//! Router and handlers. `build_router` leaves middleware to `main.rs` so the
//! tests in `tests/` can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tandem_core::{DateRange, UserId};

use crate::{
    api_types::{
        ConfirmRequest, ConfirmResponse, ConfirmedPairsResponse, DetectRequest, DetectResponse,
        HealthResponse, ListQuery, ProgressResponse,
    },
    error::ApiError,
    state::AppState,
};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/{user_id}/transfers", get(list_confirmed))
        .route("/users/{user_id}/transfers/detect", post(detect))
        .route("/users/{user_id}/transfers/confirm", post(confirm))
        .route("/users/{user_id}/transfers/progress", get(progress))
        .route("/users/{user_id}/transfers/coverage", delete(reset_coverage))
        .with_state(state)
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) async fn detect(
    State(st): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    let Json(req) = body?;
    let range = DateRange::from_epoch_millis(req.start_date, req.end_date)?;
    let result = st
        .engine
        .detect(UserId(user_id), range, req.account_ids.as_deref())
        .await?;
    Ok(Json(result.into()))
}

pub(crate) async fn list_confirmed(
    State(st): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ConfirmedPairsResponse>, ApiError> {
    let Query(query) = query?;
    let confirmed = st
        .engine
        .list_confirmed_pairs(UserId(user_id), query.to_range()?)
        .await?;
    Ok(Json(confirmed.into()))
}

pub(crate) async fn confirm(
    State(st): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    body: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let Json(req) = body?;
    let scanned = req.scanned_range.map(|r| r.to_range()).transpose()?;
    let result = st
        .engine
        .bulk_confirm(UserId(user_id), &req.pairs, scanned)
        .await?;
    Ok(Json(result.into()))
}

pub(crate) async fn progress(
    State(st): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let user = UserId(user_id);
    let (report, state) = tokio::try_join!(
        st.engine.progress_and_recommendation(user),
        st.engine.state(user),
    )?;
    Ok(Json(ProgressResponse::new(report, state)))
}

pub(crate) async fn reset_coverage(
    State(st): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    st.engine.reset_coverage(UserId(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
