//! # krystal-core
//!
//! The power mapping engine for Krystal - THE LOGIC.
//!
//! This crate turns entities (corporations, government bodies, officials,
//! organizations) and the relationships between them into an undirected
//! influence network, then analyses it: centrality, community structure,
//! structural statistics, influence scores and key findings.
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: NO async, NO network dependencies
//! - Deterministic: `BTreeMap` ordering everywhere, no randomness
//! - Closed: data sources and clocks live in the app, never here

// =============================================================================
// MODULES
// =============================================================================

pub mod centrality;
pub mod community;
pub mod export;
pub mod findings;
pub mod graph;
pub mod influence;
pub mod ingestor;
pub mod mapper;
pub mod primitives;
pub mod storage;
pub mod structure;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Entity, EntityId, EntityKind, KrystalError, Metadata, Relationship};

// =============================================================================
// RE-EXPORTS: Analysis Engine
// =============================================================================

pub use centrality::CentralityReport;
pub use community::{Community, CommunityReport};
pub use export::{
    CanonicalEntity, CanonicalHeader, CanonicalNetwork, CanonicalRelationship, ExportMetadata,
    NetworkExport, canonical_checksum, export_canonical, import_canonical, verify_canonical,
};
pub use findings::key_findings;
pub use graph::PowerGraph;
pub use influence::{InfluenceCalculator, InfluenceRanking, InfluenceWeights};
pub use ingestor::{IngestReport, Ingestor};
pub use mapper::{
    AnalysisConfig, ConnectionPath, NetworkAnalysis, NetworkSummary, Neighbor, PowerMapper,
    create_sample_network, sample_entities, sample_relationships,
};
pub use storage::{NetworkBackend, NetworkSnapshot, NetworkStore};
pub use structure::{DegreeDistribution, Diameter, StructuralAnalysis};

#[cfg(feature = "crypto-hash")]
pub use export::{canonical_crypto_hash, verify_crypto_hash};
