//! # Ingestor Module
//!
//! Record validation and network construction.
//!
//! - Validate entity records before graph mutation
//! - Derive missing entity ids from names
//! - Drop relationships that are dangling, self-referential or too weak
//! - No enrichment: records enter the graph as given

use crate::graph::PowerGraph;
use crate::primitives::{MAX_NAME_LENGTH, MAX_RELATIONSHIPS_PER_QUERY};
use crate::{Entity, EntityId, KrystalError, Relationship};
use serde::{Deserialize, Serialize};

/// Counters describing what happened to an input batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub entities_added: usize,
    pub relationships_added: usize,
    pub skipped_dangling: usize,
    pub skipped_self: usize,
    pub skipped_weak: usize,
}

impl IngestReport {
    /// Relationships that did not become edges.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped_dangling + self.skipped_self + self.skipped_weak
    }
}

/// The Ingestor turns raw records into a `PowerGraph`.
pub struct Ingestor;

impl Ingestor {
    /// Validate a single entity record.
    ///
    /// An entity is valid if its name fits within `MAX_NAME_LENGTH` and it
    /// has either an id or a name to derive one from.
    pub fn validate_entity(entity: &Entity) -> Result<(), KrystalError> {
        if entity.name.len() > MAX_NAME_LENGTH {
            return Err(KrystalError::InvalidEntity(format!(
                "name length {} exceeds maximum {} bytes",
                entity.name.len(),
                MAX_NAME_LENGTH
            )));
        }
        Ok(())
    }

    /// Validate a batch and assign ids to entities that lack one.
    ///
    /// The derived id is the lower-cased name stripped to alphanumerics,
    /// `_` and `-`; `entity_{index}` when that leaves nothing.
    pub fn prepare_entities(
        entities: &[Entity],
        max_entities: usize,
    ) -> Result<Vec<Entity>, KrystalError> {
        if entities.len() > max_entities {
            return Err(KrystalError::LimitExceeded(format!(
                "entity count {} exceeds maximum {}",
                entities.len(),
                max_entities
            )));
        }

        entities
            .iter()
            .enumerate()
            .map(|(index, entity)| {
                Self::validate_entity(entity)?;
                let mut prepared = entity.clone();
                if prepared.id.is_none() {
                    prepared.id = Some(EntityId::from_name(&prepared.name, index));
                }
                Ok(prepared)
            })
            .collect()
    }

    /// Build a graph from records.
    ///
    /// Every prepared entity becomes a node. A relationship becomes an edge
    /// only if both endpoints exist, they differ, and its strength is at
    /// least `min_strength`.
    pub fn build_graph(
        entities: &[Entity],
        relationships: &[Relationship],
        min_strength: f64,
        max_entities: usize,
    ) -> Result<(PowerGraph, IngestReport), KrystalError> {
        if relationships.len() > MAX_RELATIONSHIPS_PER_QUERY {
            return Err(KrystalError::LimitExceeded(format!(
                "relationship count {} exceeds maximum {}",
                relationships.len(),
                MAX_RELATIONSHIPS_PER_QUERY
            )));
        }

        let prepared = Self::prepare_entities(entities, max_entities)?;
        let mut graph = PowerGraph::new();
        let mut report = IngestReport::default();

        for entity in prepared {
            graph.insert_entity(entity)?;
        }
        report.entities_added = graph.node_count();

        for rel in relationships {
            if rel.source == rel.target {
                report.skipped_self += 1;
                continue;
            }
            if !graph.contains(&rel.source) || !graph.contains(&rel.target) {
                tracing::debug!(
                    source = %rel.source,
                    target = %rel.target,
                    "Skipping relationship with unknown endpoint"
                );
                report.skipped_dangling += 1;
                continue;
            }
            let strength = rel.strength();
            if strength.is_nan() || strength < min_strength {
                report.skipped_weak += 1;
                continue;
            }
            if graph.insert_relationship(rel.clone()) {
                report.relationships_added += 1;
            }
        }

        if report.skipped() > 0 {
            tracing::debug!(
                dangling = report.skipped_dangling,
                self_loops = report.skipped_self,
                weak = report.skipped_weak,
                "Relationships not added to the network"
            );
        }

        Ok((graph, report))
    }
}

// =============================================================================
// TESTS
// =============================================================================
