//! # API Endpoint Handlers
//!
//! Each handler borrows the shared engine, calls one engine operation and
//! maps [`StrandError`] onto an HTTP status.

use super::{
    AppState,
    types::{
        ChainResponse, ConflictsResponse, EdgeRequest, ErrorResponse, ExecuteRequest,
        FactResponse, HealthResponse, HopsRequest, NodeRequest, PathsRequest, QueryResponse,
        StatsResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use strand_core::{EventId, ExecuteOptions, NodeId, StrandError};

/// HTTP status for an engine error.
fn status_for(error: &StrandError) -> StatusCode {
    match error {
        StrandError::MissingField { .. }
        | StrandError::InvalidConfidence(_)
        | StrandError::InvalidPipeline(_) => StatusCode::BAD_REQUEST,
        StrandError::Nullity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StrandError::Ingestion { .. } => StatusCode::CONFLICT,
        StrandError::Serialization(_) | StrandError::Io(_) | StrandError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// =============================================================================
// HEALTH / STATS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Counts and vocabularies of the index.
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.engine.get_stats();
    (StatusCode::OK, Json(StatsResponse::from(stats)))
}

// =============================================================================
// FACT HANDLERS
// =============================================================================

/// Record a node fact.
pub async fn add_node_handler(
    State(state): State<AppState>,
    Json(request): Json<NodeRequest>,
) -> impl IntoResponse {
    let actor = request.actor.clone();
    let (node, context) = request.into_parts();
    match state.engine.add_node(node, actor.as_deref(), context) {
        Ok(id) => (StatusCode::OK, Json(FactResponse::success(id))),
        Err(e) => (
            status_for(&e),
            Json(FactResponse::error(format!("Add node failed: {}", e))),
        ),
    }
}

/// Record an edge fact, optionally superseding an earlier version.
pub async fn add_edge_handler(
    State(state): State<AppState>,
    Json(request): Json<EdgeRequest>,
) -> impl IntoResponse {
    let actor = request.actor.clone();
    let (edge, context, supersedes) = request.into_parts();
    match state.engine.add_edge(edge, actor.as_deref(), context, supersedes) {
        Ok(id) => (StatusCode::OK, Json(FactResponse::success(id))),
        Err(e) => (
            status_for(&e),
            Json(FactResponse::error(format!("Add edge failed: {}", e))),
        ),
    }
}

// =============================================================================
// QUERY HANDLERS
// =============================================================================

/// Parse, validate and run a pipeline.
pub async fn execute_handler(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> impl IntoResponse {
    let outcome = state.engine.parse_pipeline(request.pipeline).and_then(|pipeline| {
        state.engine.execute(
            &pipeline,
            ExecuteOptions {
                start_nodes: request.start_nodes,
            },
        )
    });
    query_response(outcome)
}

/// Paths between two nodes.
pub async fn paths_handler(
    State(state): State<AppState>,
    Json(request): Json<PathsRequest>,
) -> impl IntoResponse {
    let (options, context) = request.options();
    query_response(state.engine.find_paths_with_context(
        request.from,
        request.to,
        options,
        context,
    ))
}

/// Neighbourhood of a node within a hop limit.
pub async fn hops_handler(
    State(state): State<AppState>,
    Json(request): Json<HopsRequest>,
) -> impl IntoResponse {
    let (options, context) = request.options();
    query_response(
        state
            .engine
            .find_within_hops(request.start, request.max_hops, options, context),
    )
}

fn query_response(
    outcome: Result<strand_core::QueryResult, StrandError>,
) -> (StatusCode, Json<QueryResponse>) {
    match outcome {
        Ok(result) => (StatusCode::OK, Json(QueryResponse::success(result))),
        Err(e) => {
            tracing::debug!(error = %e, "query rejected");
            (
                status_for(&e),
                Json(QueryResponse::error(format!("Query failed: {}", e))),
            )
        }
    }
}

// =============================================================================
// INSPECTION HANDLERS
// =============================================================================

/// Keys with more than one recorded version.
pub async fn conflicts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let conflicts = state.engine.get_conflicting_edges();
    (
        StatusCode::OK,
        Json(ConflictsResponse {
            count: conflicts.len(),
            conflicts,
        }),
    )
}

/// The supersession chain through one edge.
pub async fn chain_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = EventId::from(id);
    let versions = state.engine.get_supersession_chain(&id);
    if versions.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Unknown edge {}", id))),
        )
            .into_response();
    }
    (StatusCode::OK, Json(ChainResponse { id, versions })).into_response()
}

/// A single edge version.
pub async fn edge_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = EventId::from(id);
    match state.engine.edge(&id) {
        Some(edge) => (StatusCode::OK, Json(edge)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Unknown edge {}", id))),
        )
            .into_response(),
    }
}

/// A single node record.
pub async fn node_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = NodeId::from(id);
    match state.engine.node(&id) {
        Some(node) => (StatusCode::OK, Json(node)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Unknown node {}", id))),
        )
            .into_response(),
    }
}
