//! Live count read path and on-demand reconciliation.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use member_store::{MemberStore, MemberStoreExt};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::members::AppState;

#[derive(Serialize)]
pub struct CountResponse {
    pub count: i64,
    pub last_updated: String,
}

#[derive(Serialize)]
pub struct RecalculateResponse {
    pub count: i64,
}

/// GET /count — the O(1) read path.
///
/// Reads only the counter row; never scans the ledger. A missing counter
/// row is rebuilt transparently by the store before this returns.
#[tracing::instrument(skip(state))]
pub async fn get<S: MemberStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<CountResponse>, ApiError> {
    let counter = state.store.current_count().await?;

    Ok(Json(CountResponse {
        count: counter.count,
        last_updated: counter.last_updated.to_rfc3339(),
    }))
}

/// POST /count/recalculate — rebuild the counter from a full ledger scan.
#[tracing::instrument(skip(state))]
pub async fn recalculate<S: MemberStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<RecalculateResponse>, ApiError> {
    let count = state.store.recalculate().await?;

    Ok(Json(RecalculateResponse { count }))
}
