//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                            | Return Type         |
// |-----------------------|----------------------------------------|---------------------|
// | health                | Health check endpoint                  | Response            |
// | place_order           | Enqueue a new order                    | ApiResult<Response> |
// | cancel_order          | Enqueue a cancel                       | ApiResult<Response> |
// | modify_order          | Enqueue a reduce-only modify           | ApiResult<Response> |
// | get_snapshot          | Quotes + recent trades                 | ApiResult<Response> |
// | get_depth             | Top-N depth per side                   | ApiResult<Response> |
// | get_mid_series        | Mid price series over a window         | ApiResult<Response> |
// | get_accounts          | Per-owner ledger rows                  | ApiResult<Response> |
// | get_stats             | Worker run counters                    | ApiResult<Response> |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::{
    AccountDto, ApiError, ApiResult, AppState, DepthLevelDto, DepthQuery, DepthResponse,
    EnqueueResponse, MidSeriesQuery, ModifyQtyRequest, OrderAckResponse, PlaceOrderRequest,
    SnapshotQuery,
};
use crate::types::OrderId;

const DEFAULT_MAX_TRADES: usize = 50;
const DEFAULT_DEPTH_LEVELS: usize = 10;
const DEFAULT_MID_WINDOW_NS: i64 = 60_000_000_000;

/// Health check endpoint
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "running": state.world.is_running(),
        "ts": state.world.current_ts(),
    }))
}

/// Enqueue a new order for the next tick
pub async fn place_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<Response> {
    if req.qty <= 0 {
        return Err(ApiError::BadRequest("qty must be positive".to_string()));
    }

    let ack = state.world.submit_order(req.into_order());
    let response = OrderAckResponse::from(ack);
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Enqueue a cancel for an order id
pub async fn cancel_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Response> {
    let enqueued = state.world.cancel_order(order_id);
    Ok(Json(EnqueueResponse { enqueued }).into_response())
}

/// Enqueue a reduce-only quantity modification
pub async fn modify_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
    Json(req): Json<ModifyQtyRequest>,
) -> ApiResult<Response> {
    if req.new_qty <= 0 {
        return Err(ApiError::BadRequest("new_qty must be positive".to_string()));
    }
    let enqueued = state.world.modify_qty(order_id, req.new_qty);
    Ok(Json(EnqueueResponse { enqueued }).into_response())
}

/// Current quotes, last trade and recent trades
pub async fn get_snapshot(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SnapshotQuery>,
) -> ApiResult<Response> {
    let max_trades = params.max_trades.unwrap_or(DEFAULT_MAX_TRADES);
    let snapshot = state.world.snapshot(max_trades);
    Ok(Json(snapshot).into_response())
}

/// Top-N aggregated depth per side
pub async fn get_depth(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<DepthQuery>,
) -> ApiResult<Response> {
    let levels = params.levels.unwrap_or(DEFAULT_DEPTH_LEVELS);
    let depth = state.world.book_depth(levels);

    let to_dto = |ls: &crate::types::LevelSummary| DepthLevelDto {
        price: ls.price,
        qty: ls.total_qty,
        orders: ls.order_count,
    };
    let response = DepthResponse {
        bids: depth.bids.iter().map(to_dto).collect(),
        asks: depth.asks.iter().map(to_dto).collect(),
    };
    Ok(Json(response).into_response())
}

/// Mid price series over the trailing window
pub async fn get_mid_series(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<MidSeriesQuery>,
) -> ApiResult<Response> {
    let window_ns = params.window_ns.unwrap_or(DEFAULT_MID_WINDOW_NS);
    if window_ns < 0 {
        return Err(ApiError::BadRequest("window_ns must be non-negative".to_string()));
    }
    let series = state.world.mid_series(window_ns);
    Ok(Json(series).into_response())
}

/// Per-owner account rows
pub async fn get_accounts(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    let rows: Vec<AccountDto> = state
        .world
        .accounts_snapshot()
        .into_iter()
        .map(|(owner, acct)| AccountDto::from_entry(owner, acct))
        .collect();
    Ok(Json(rows).into_response())
}

/// Worker run counters
pub async fn get_stats(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Response> {
    Ok(Json(state.world.stats()).into_response())
}
