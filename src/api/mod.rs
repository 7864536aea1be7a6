//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a REST API using Axum for the live world.
// It exposes bounded read snapshots and POST command endpoints; every
// mutation travels through the world's command queue, never directly into
// the engine.
//
// | Component      | Description                                                |
// |----------------|-----------------------------------------------------------|
// | Api            | Main API structure coordinating routes and state           |
// | Routes         | Handler functions for API endpoints                        |
// | AppState       | Shared application state (the live world)                  |
// | DTOs           | Data transfer objects for API requests/responses           |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::live_world::LiveWorld;

pub use dto::*;
pub use error::{ApiError, ApiResult};

/// Shared application state accessible by all handlers.
pub struct AppState {
    /// The live world serving snapshots and accepting commands.
    pub world: Arc<LiveWorld>,
}

/// Main API structure.
pub struct Api {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl Api {
    /// Creates a new API instance over a running live world.
    pub fn new(addr: SocketAddr, world: Arc<LiveWorld>) -> Self {
        Self {
            addr,
            state: Arc::new(AppState { world }),
        }
    }

    /// Creates all routes for the API.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin([
                "http://localhost:3000".parse::<HeaderValue>().unwrap(),
                "http://127.0.0.1:3000".parse::<HeaderValue>().unwrap(),
            ])
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/health", get(routes::health))
            .route("/api/orders", post(routes::place_order))
            .route("/api/orders/:id/cancel", post(routes::cancel_order))
            .route("/api/orders/:id/modify", post(routes::modify_order))
            .route("/api/snapshot", get(routes::get_snapshot))
            .route("/api/depth", get(routes::get_depth))
            .route("/api/mid_series", get(routes::get_mid_series))
            .route("/api/accounts", get(routes::get_accounts))
            .route("/api/stats", get(routes::get_stats))
            .layer(cors)
            .layer(Extension(Arc::clone(&self.state)))
    }

    /// Binds and serves until the process is stopped.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "gateway listening");
        axum::serve(listener, self.routes()).await
    }
}
