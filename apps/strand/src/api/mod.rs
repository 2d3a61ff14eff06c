//! # Strand HTTP API Module
//!
//! HTTP REST API over a shared [`GraphEngine`], built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /stats` - Index statistics
//! - `POST /nodes` - Record a node fact
//! - `POST /edges` - Record an edge fact
//! - `POST /execute` - Run a pipeline
//! - `POST /paths` - Paths between two nodes
//! - `POST /hops` - Nodes within N hops
//! - `GET /conflicts` - Relationships with several versions
//! - `GET /nodes/{id}`, `GET /edges/{id}` - Single records
//! - `GET /edges/{id}/chain` - Supersession chain of an edge

mod auth;
mod handlers;
mod types;

pub use handlers::{
    add_edge_handler, add_node_handler, chain_handler, conflicts_handler, edge_handler,
    execute_handler, health_handler, hops_handler, node_handler, paths_handler, stats_handler,
};
pub use types::{
    ChainResponse, ConflictsResponse, EdgeRequest, ErrorResponse, ExecuteRequest, FactResponse,
    HealthResponse, HopsRequest, NodeRequest, PathsRequest, QueryResponse, StatsResponse,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use strand_core::{GraphEngine, StrandError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The engine; it synchronises internally.
    pub engine: Arc<GraphEngine>,
    /// Bearer key, if authentication is enabled.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: GraphEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            api_key: None,
        }
    }

    /// Require `key` on every route except `/health`. Empty keys disable
    /// authentication.
    #[must_use]
    pub fn with_api_key(mut self, key: Option<&str>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty()).map(Arc::from);
        self
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// `None` allows localhost only. `["*"]` allows every origin.
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        tracing::info!("CORS: no origins configured, defaulting to localhost only");
        return build_localhost_cors();
    };

    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }

    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit,
/// authentication.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = build_cors_layer(server.cors_origins.as_deref());

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/nodes", post(handlers::add_node_handler))
        .route("/nodes/{id}", get(handlers::node_handler))
        .route("/edges", post(handlers::add_edge_handler))
        .route("/edges/{id}", get(handlers::edge_handler))
        .route("/edges/{id}/chain", get(handlers::chain_handler))
        .route("/execute", post(handlers::execute_handler))
        .route("/paths", post(handlers::paths_handler))
        .route("/hops", post(handlers::hops_handler))
        .route("/conflicts", get(handlers::conflicts_handler));

    if state.api_key.is_some() {
        tracing::info!("API key authentication enabled");
        router = router.layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::api_key_auth_middleware,
        ));
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible. \
             Set server.api_key or STRAND_API_KEY to enable it."
        );
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(server.body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `server.host:server.port` and serve until the process stops.
pub async fn run_server(engine: GraphEngine, server: &ServerConfig) -> Result<(), StrandError> {
    let state = AppState::new(engine).with_api_key(server.api_key.as_deref());
    let router = create_router(state, server);
    let addr = format!("{}:{}", server.host, server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StrandError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Strand HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| StrandError::Io(format!("Server error: {}", e)))
}
