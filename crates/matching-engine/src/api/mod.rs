//! HTTP API for the matching engine (behind the `api` feature).

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
