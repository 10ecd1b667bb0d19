//! HTTP handlers for the matching engine's internal API.
//!
//! One [`MatchingEngine`] is not `Sync` on its own (every mutating call
//! takes `&mut self`), so the shared state here wraps it in a
//! [`parking_lot::Mutex`] — the same primitive `ledger::InMemoryLedger`
//! uses for its balance map — rather than reaching for an async lock: every
//! request holds it only for the duration of one matching call, never
//! across an `.await`.

use axum::{
    extract::{Path, State},
    Json,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::{Order, OrderId};
use crate::engine::MatchingEngine;
use common::{Address, Amount};

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Mutex<MatchingEngine>>,
}

#[derive(Debug, Deserialize)]
pub struct LimitOrderRequest {
    pub maker: Address,
    pub price: Amount,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct MarketOrderRequest {
    pub maker: Address,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct OrderAcceptedResponse {
    pub order_id: OrderId,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type HandlerResult<T> = Result<Json<T>, (axum::http::StatusCode, Json<ErrorResponse>)>;

fn to_http_error(err: impl ToString) -> (axum::http::StatusCode, Json<ErrorResponse>) {
    (
        axum::http::StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: err.to_string() }),
    )
}

pub async fn add_bid(
    State(state): State<ApiState>,
    Json(req): Json<LimitOrderRequest>,
) -> HandlerResult<OrderAcceptedResponse> {
    let order_id = state
        .engine
        .lock()
        .add_bid(req.maker, req.price, req.amount)
        .map_err(to_http_error)?;
    Ok(Json(OrderAcceptedResponse { order_id }))
}

pub async fn add_ask(
    State(state): State<ApiState>,
    Json(req): Json<LimitOrderRequest>,
) -> HandlerResult<OrderAcceptedResponse> {
    let order_id = state
        .engine
        .lock()
        .add_ask(req.maker, req.price, req.amount)
        .map_err(to_http_error)?;
    Ok(Json(OrderAcceptedResponse { order_id }))
}

pub async fn market_buy(
    State(state): State<ApiState>,
    Json(req): Json<MarketOrderRequest>,
) -> HandlerResult<OrderAcceptedResponse> {
    let order_id = state
        .engine
        .lock()
        .market_buy(req.maker, req.amount)
        .map_err(to_http_error)?;
    Ok(Json(OrderAcceptedResponse { order_id }))
}

pub async fn market_sell(
    State(state): State<ApiState>,
    Json(req): Json<MarketOrderRequest>,
) -> HandlerResult<OrderAcceptedResponse> {
    let order_id = state
        .engine
        .lock()
        .market_sell(req.maker, req.amount)
        .map_err(to_http_error)?;
    Ok(Json(OrderAcceptedResponse { order_id }))
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub caller: Address,
}

pub async fn cancel_order(
    State(state): State<ApiState>,
    Path(order_id): Path<u64>,
    Json(req): Json<CancelOrderRequest>,
) -> HandlerResult<serde_json::Value> {
    state
        .engine
        .lock()
        .cancel_order(req.caller, OrderId(order_id))
        .map_err(to_http_error)?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}

pub async fn get_order(State(state): State<ApiState>, Path(order_id): Path<u64>) -> Json<Order> {
    Json(state.engine.lock().order(OrderId(order_id)))
}

#[derive(Debug, Serialize)]
pub struct BookSummaryResponse {
    pub best_bid_price: Amount,
    pub best_ask_price: Amount,
    pub market_price: Amount,
}

pub async fn book_summary(State(state): State<ApiState>) -> Json<BookSummaryResponse> {
    let engine = state.engine.lock();
    Json(BookSummaryResponse {
        best_bid_price: engine.best_bid_price(),
        best_ask_price: engine.best_ask_price(),
        market_price: engine.market_price(),
    })
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "matching-engine" }))
}
