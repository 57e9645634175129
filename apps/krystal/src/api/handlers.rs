//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ExportQuery, ExportResponse, HashResponse, HealthResponse, InfluenceResponse,
        InvestigateRequest, InvestigateResponse, NeighborsRequest, NeighborsResponse,
        NetworkRequest, NetworkResponse, PathsRequest, PathsResponse, StatusResponse,
    },
};
use crate::investigate::{analyze_collected, collect_network};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use krystal_core::{
    EntityId, KrystalError, canonical_checksum, canonical_crypto_hash, export_canonical,
};

/// Status code for an engine error.
fn error_status(err: &KrystalError) -> StatusCode {
    match err {
        KrystalError::IoError(_) | KrystalError::SerializationError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        KrystalError::EntityNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get network status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mapper = state.mapper.read().await;
    let graph = mapper.graph();

    let response = StatusResponse {
        entity_count: graph.node_count(),
        relationship_count: mapper.relationships().len(),
        edge_count: graph.edge_count(),
        network_density: graph.density(),
        connected_components: graph.connected_components().len(),
        analysis_cached: mapper.cached_analysis().is_some(),
    };

    (StatusCode::OK, Json(response))
}

// =============================================================================
// NETWORK HANDLER
// =============================================================================

/// Replace the network and analyse it.
pub async fn network_handler(
    State(state): State<AppState>,
    Json(request): Json<NetworkRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(NetworkResponse::error(format!("Invalid network: {}", e))),
        );
    }

    let result = state
        .commit(|mapper| {
            let analysis = mapper.analyze_network(&request.entities, &request.relationships)?;
            Ok((mapper.last_ingest(), analysis))
        })
        .await;

    match result {
        Ok((report, analysis)) => (
            StatusCode::OK,
            Json(NetworkResponse::success(report, analysis)),
        ),
        Err(e) => (
            error_status(&e),
            Json(NetworkResponse::error(format!("Load failed: {}", e))),
        ),
    }
}

// =============================================================================
// ANALYSIS HANDLER
// =============================================================================

/// Full analysis of the current network.
///
/// Takes the write lock: the first call after a load fills the cache.
pub async fn analysis_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut mapper = state.mapper.write().await;
    (StatusCode::OK, Json(mapper.analysis().clone()))
}

// =============================================================================
// INFLUENCE HANDLER
// =============================================================================

/// Influence score of one entity.
pub async fn influence_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let entity_id = EntityId::new(id);
    let mapper = state.mapper.read().await;
    let found = mapper.graph().contains(&entity_id);

    let response = InfluenceResponse {
        influence_score: mapper.calculate_influence(&entity_id),
        entity_id,
        found,
    };
    let status = if found {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (status, Json(response))
}

// =============================================================================
// QUERY HANDLERS
// =============================================================================

/// Connection paths between two entities.
pub async fn paths_handler(
    State(state): State<AppState>,
    Json(request): Json<PathsRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(PathsResponse::error(format!("Invalid query: {}", e))),
        );
    }

    let mapper = state.mapper.read().await;
    let paths = mapper.find_connection_paths(&request.from, &request.to, request.max_paths);
    (StatusCode::OK, Json(PathsResponse::with_paths(paths)))
}

/// Neighbours of an entity.
pub async fn neighbors_handler(
    State(state): State<AppState>,
    Json(request): Json<NeighborsRequest>,
) -> impl IntoResponse {
    let mapper = state.mapper.read().await;
    let neighbors =
        mapper.get_entity_neighbors(&request.entity_id, request.relationship_type.as_deref());

    let response = NeighborsResponse {
        success: true,
        found: mapper.graph().contains(&request.entity_id),
        neighbors,
    };
    (StatusCode::OK, Json(response))
}

// =============================================================================
// EXPORT HANDLERS
// =============================================================================

/// Export the network as JSON (default) or base64 canonical binary.
pub async fn export_handler(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> impl IntoResponse {
    let format = query.format.as_deref().unwrap_or("json").to_lowercase();
    let mapper = state.mapper.read().await;

    let result = match format.as_str() {
        "canonical" => {
            let snapshot = mapper.snapshot();
            export_canonical(&snapshot).and_then(|data| {
                let checksum = canonical_checksum(&snapshot)?;
                Ok(ExportResponse::canonical(data, checksum))
            })
        }
        other => mapper
            .export_network_data(other, &timestamp())
            .map(ExportResponse::json),
    };

    match result {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => (
            error_status(&e),
            Json(ExportResponse::error(format!("Export failed: {}", e))),
        ),
    }
}

/// BLAKE3 hash of the canonical export.
pub async fn hash_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mapper = state.mapper.read().await;
    let snapshot = mapper.snapshot();

    let (status, hash, error) = match canonical_crypto_hash(&snapshot) {
        Ok(hash) => (StatusCode::OK, Some(hash), None),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            Some(format!("Hash failed: {}", e)),
        ),
    };

    let response = HashResponse {
        success: hash.is_some(),
        hash,
        algorithm: "blake3".to_string(),
        entity_count: snapshot.entities.len(),
        relationship_count: snapshot.relationships.len(),
        error,
    };
    (status, Json(response))
}

// =============================================================================
// INVESTIGATE HANDLER
// =============================================================================

/// Investigate a news query and replace the network with the result.
pub async fn investigate_handler(
    State(state): State<AppState>,
    Json(request): Json<InvestigateRequest>,
) -> impl IntoResponse {
    let query = match request.validated_query() {
        Ok(q) => q,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(InvestigateResponse::error(format!("Invalid query: {}", e))),
            );
        }
    };

    // no lock is held while the sources are queried
    let collected = collect_network(&state.sources, query).await;

    let analyzed_at = timestamp();
    let result = state
        .commit(|mapper| analyze_collected(mapper, collected, analyzed_at))
        .await;

    match result {
        Ok(investigation) => (
            StatusCode::OK,
            Json(InvestigateResponse::success(investigation)),
        ),
        Err(e) => (
            error_status(&e),
            Json(InvestigateResponse::error(format!(
                "Investigation failed: {}",
                e
            ))),
        ),
    }
}
