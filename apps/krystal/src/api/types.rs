//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::investigate::Investigation;
use krystal_core::{
    ConnectionPath, Entity, EntityId, IngestReport, KrystalError, NetworkAnalysis, Neighbor,
    Relationship,
    primitives::{DEFAULT_MAX_PATHS, MAX_ENTITIES_PER_QUERY, MAX_PATHS_LIMIT},
};
use serde::{Deserialize, Serialize};

/// Maximum length of an investigation query in bytes.
pub const MAX_QUERY_LENGTH: usize = 256;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Network status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Entities in the network.
    pub entity_count: usize,
    /// Relationship records loaded, including those that did not become edges.
    pub relationship_count: usize,
    pub edge_count: usize,
    pub network_density: f64,
    pub connected_components: usize,
    /// Whether `GET /analysis` will answer from cache.
    pub analysis_cached: bool,
}

// =============================================================================
// NETWORK REQUEST/RESPONSE
// =============================================================================

/// Replace the network with these records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkRequest {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl NetworkRequest {
    /// Reject oversized batches before taking the write lock.
    pub fn validate(&self) -> Result<(), KrystalError> {
        if self.entities.len() > MAX_ENTITIES_PER_QUERY {
            return Err(KrystalError::LimitExceeded(format!(
                "Entity count {} exceeds maximum {}",
                self.entities.len(),
                MAX_ENTITIES_PER_QUERY
            )));
        }
        Ok(())
    }
}

/// Result of loading a network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkResponse {
    pub success: bool,
    pub ingest: Option<IngestReport>,
    pub analysis: Option<NetworkAnalysis>,
    pub error: Option<String>,
}

impl NetworkResponse {
    pub fn success(ingest: IngestReport, analysis: NetworkAnalysis) -> Self {
        Self {
            success: true,
            ingest: Some(ingest),
            analysis: Some(analysis),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            ingest: None,
            analysis: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// INFLUENCE RESPONSE
// =============================================================================

/// Influence score of one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceResponse {
    pub entity_id: EntityId,
    pub found: bool,
    pub influence_score: f64,
}

// =============================================================================
// PATHS REQUEST/RESPONSE
// =============================================================================

fn default_max_paths() -> usize {
    DEFAULT_MAX_PATHS
}

/// Connection path query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsRequest {
    pub from: EntityId,
    pub to: EntityId,
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

impl PathsRequest {
    pub fn validate(&self) -> Result<(), KrystalError> {
        if self.max_paths > MAX_PATHS_LIMIT {
            return Err(KrystalError::LimitExceeded(format!(
                "max_paths {} exceeds maximum {}",
                self.max_paths, MAX_PATHS_LIMIT
            )));
        }
        Ok(())
    }
}

/// Connection paths between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsResponse {
    pub success: bool,
    pub paths: Vec<ConnectionPath>,
    pub count: usize,
    pub error: Option<String>,
}

impl PathsResponse {
    pub fn with_paths(paths: Vec<ConnectionPath>) -> Self {
        Self {
            success: true,
            count: paths.len(),
            paths,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            paths: Vec::new(),
            count: 0,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// NEIGHBORS REQUEST/RESPONSE
// =============================================================================

/// Neighbour query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborsRequest {
    pub entity_id: EntityId,
    #[serde(default)]
    pub relationship_type: Option<String>,
}

/// Neighbours of an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborsResponse {
    pub success: bool,
    pub found: bool,
    pub neighbors: Vec<Neighbor>,
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export query string: `?format=json|canonical`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// Exported network.
///
/// `data` is the JSON document for `json`, base64 of the binary file for
/// `canonical`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub format: Option<String>,
    pub data: Option<String>,
    pub checksum: Option<u64>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn json(document: String) -> Self {
        Self {
            success: true,
            format: Some("json".to_string()),
            data: Some(document),
            checksum: None,
            error: None,
        }
    }

    pub fn canonical(data: Vec<u8>, checksum: u64) -> Self {
        Self {
            success: true,
            format: Some("canonical".to_string()),
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                &data,
            )),
            checksum: Some(checksum),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            format: None,
            data: None,
            checksum: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// HASH RESPONSE
// =============================================================================

/// BLAKE3 hash of the canonical export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashResponse {
    pub success: bool,
    pub hash: Option<String>,
    pub algorithm: String,
    pub entity_count: usize,
    pub relationship_count: usize,
    pub error: Option<String>,
}

// =============================================================================
// INVESTIGATE REQUEST/RESPONSE
// =============================================================================

/// Investigate a news query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigateRequest {
    pub query: String,
}

impl InvestigateRequest {
    /// Trimmed query, validated for emptiness and length.
    pub fn validated_query(&self) -> Result<&str, KrystalError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(KrystalError::InvalidEntity(
                "query must not be empty".to_string(),
            ));
        }
        if query.len() > MAX_QUERY_LENGTH {
            return Err(KrystalError::LimitExceeded(format!(
                "Query length {} exceeds maximum {} bytes",
                query.len(),
                MAX_QUERY_LENGTH
            )));
        }
        Ok(query)
    }
}

/// Investigation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigateResponse {
    pub success: bool,
    pub investigation: Option<Investigation>,
    pub error: Option<String>,
}

impl InvestigateResponse {
    pub fn success(investigation: Investigation) -> Self {
        Self {
            success: true,
            investigation: Some(investigation),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            investigation: None,
            error: Some(msg.into()),
        }
    }
}
