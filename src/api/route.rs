use crate::{
    api::{
        error::ApiError,
        response::{with_total_count, ApiResponse},
    },
    blockchain::RpcStats,
    db::{accounts, reclaims, stats},
    models::{now_millis, ReclaimEvent, StatsSnapshot, StoreStats, TrackedAccount},
    state::AppState,
    validation::{validate_limit, validate_solana_address},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub store: StoreStats,
    pub latest_snapshot: Option<StatsSnapshot>,
    pub rpc: RpcStats,
    pub cached_accounts: u64,
    pub dry_run: bool,
}

#[derive(Serialize)]
pub struct AccountDetail {
    #[serde(flatten)]
    pub account: TrackedAccount,
    pub reclaim_attempts: i64,
}

/// Read-only dashboard routes over the tracking store.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stats", get(get_stats))
        .route("/api/accounts", get(list_accounts))
        .route("/api/accounts/due", get(due_accounts))
        .route("/api/accounts/{address}", get(get_account))
        .route("/api/accounts/{address}/history", get(account_history))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "timestamp": now_millis() })),
    )
        .into_response()
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let response = StatsResponse {
        store: stats::get_stats(&state.db_pool).await?,
        latest_snapshot: stats::get_latest_stats(&state.db_pool).await?,
        rpc: state.client.stats().await,
        cached_accounts: state.client.cached_entries().await,
        dry_run: state.config.dry_run,
    };

    Ok(ApiResponse::new(response).into_response())
}

async fn list_accounts(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let records = accounts::get_all_accounts(&state.db_pool).await?;
    let total = records.len() as i64;
    Ok(with_total_count(records, total))
}

async fn due_accounts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> Result<Response, ApiError> {
    let limit = validate_limit(params.limit.as_deref(), DEFAULT_LIMIT, MAX_LIMIT)?;
    let due = accounts::due_for_check(&state.db_pool, limit, now_millis()).await?;
    debug!("{} accounts due for check", due.len());
    Ok(ApiResponse::new(due).into_response())
}

async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    validate_solana_address(&address)?;

    let account = accounts::get_account(&state.db_pool, &address)
        .await?
        .ok_or_else(|| ApiError::NotFound(address.clone()))?;
    let reclaim_attempts = reclaims::count_events(&state.db_pool, &address).await?;

    Ok(ApiResponse::new(AccountDetail {
        account,
        reclaim_attempts,
    })
    .into_response())
}

async fn account_history(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Response, ApiError> {
    validate_solana_address(&address)?;
    let limit = validate_limit(params.limit.as_deref(), DEFAULT_LIMIT, MAX_LIMIT)?;

    if !accounts::is_tracked(&state.db_pool, &address).await? {
        return Err(ApiError::NotFound(address));
    }

    let events: Vec<ReclaimEvent> = reclaims::reclaim_history(&state.db_pool, &address, limit).await?;
    let total = reclaims::count_events(&state.db_pool, &address).await?;
    Ok(with_total_count(events, total))
}
