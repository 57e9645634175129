//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Krystal engine.
//!
//! The tunables (`MIN_RELATIONSHIP_STRENGTH`, `MAX_NETWORK_DEPTH`,
//! `MAX_ENTITIES_PER_QUERY`) are defaults; `AnalysisConfig` may override them.
//! The limits below the divider are hard bounds.

/// Relationships weaker than this never become edges.
pub const MIN_RELATIONSHIP_STRENGTH: f64 = 0.1;

/// Strength assumed for a relationship record that carries none.
pub const DEFAULT_RELATIONSHIP_STRENGTH: f64 = 0.5;

/// Maximum number of edges in a connection path.
pub const MAX_NETWORK_DEPTH: usize = 3;

/// Connection paths returned when the caller does not ask for a count.
pub const DEFAULT_MAX_PATHS: usize = 5;

/// Maximum number of entities accepted in a single analysis.
pub const MAX_ENTITIES_PER_QUERY: usize = 1000;

/// Maximum power iterations for eigenvector centrality.
pub const EIGENVECTOR_MAX_ITER: usize = 1000;

/// Per-node convergence tolerance for eigenvector centrality.
pub const EIGENVECTOR_TOLERANCE: f64 = 1e-3;

/// Density above which a network is reported as dense.
pub const DENSE_NETWORK_THRESHOLD: f64 = 0.5;

/// Density below which a network is reported as sparse.
pub const SPARSE_NETWORK_THRESHOLD: f64 = 0.1;

/// Louvain resolution parameter (1.0 = classic modularity).
pub const LOUVAIN_RESOLUTION: f64 = 1.0;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of relationships accepted in a single analysis.
pub const MAX_RELATIONSHIPS_PER_QUERY: usize = 10_000;

/// Maximum length of an entity name in bytes.
pub const MAX_NAME_LENGTH: usize = 512;

/// Upper bound on connection paths a single query may request.
pub const MAX_PATHS_LIMIT: usize = 100;

/// Magic bytes of the canonical network export.
pub const MAGIC_BYTES: &[u8; 4] = b"KRYX";

/// Current canonical format version.
pub const FORMAT_VERSION: u8 = 1;
