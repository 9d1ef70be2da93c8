use axum::{extract::State, Json};
use common::types::CountBody;
use tracing::debug;

use crate::errors::ApiError;
use crate::metrics;
use crate::routes::AppState;

/// 记录一次访问：计数加一并返回新值
pub async fn visit(State(state): State<AppState>) -> Result<Json<CountBody>, ApiError> {
    let count = state.store.increment().await.map_err(ApiError::visit)?;
    metrics::VISITS_TOTAL.inc();
    metrics::observe_count(count);
    debug!(count, "visit recorded");
    Ok(Json(CountBody { count }))
}

/// 只读当前计数，不做修改
pub async fn count(State(state): State<AppState>) -> Result<Json<CountBody>, ApiError> {
    let count = state.store.read().await.map_err(ApiError::count)?;
    metrics::READS_TOTAL.inc();
    metrics::observe_count(count);
    Ok(Json(CountBody { count }))
}
