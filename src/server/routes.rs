//! HTTP surface
//!
//! One read-only JSON endpoint for the current exchange rate; every other
//! path that reaches the router is a session upgrade. Requests that are
//! neither never get here, the listener resets them.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::app::currency::{CurrencyRateService, Rate};
use crate::constants::server::CURRENCY_RATE_PATH;

use super::manager::ConnectionManager;
use super::session::run_session;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub manager: Arc<ConnectionManager>,
    pub rates: Arc<CurrencyRateService>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(CURRENCY_RATE_PATH, get(currency_rate))
        .fallback(upgrade)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn currency_rate(State(state): State<GatewayState>) -> Json<Rate> {
    Json(state.rates.snapshot())
}

async fn upgrade(
    State(state): State<GatewayState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, remote, state.manager))
}
