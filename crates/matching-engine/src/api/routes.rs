//! HTTP routes for the matching engine's internal API.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::*;

/// Routes:
/// - POST   /api/v1/orders/bid           - addBid
/// - POST   /api/v1/orders/ask           - addAsk
/// - POST   /api/v1/orders/market-buy    - marketBuy
/// - POST   /api/v1/orders/market-sell   - marketSell
/// - DELETE /api/v1/orders/:order_id     - cancelOrder
/// - GET    /api/v1/orders/:order_id     - order lookup
/// - GET    /api/v1/book                 - best bid/ask/market price
/// - GET    /api/v1/health               - health check
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/orders/bid", post(add_bid))
        .route("/api/v1/orders/ask", post(add_ask))
        .route("/api/v1/orders/market-buy", post(market_buy))
        .route("/api/v1/orders/market-sell", post(market_sell))
        .route(
            "/api/v1/orders/:order_id",
            get(get_order).delete(cancel_order),
        )
        .route("/api/v1/book", get(book_summary))
        .with_state(state)
}
