//! # Power Mapper
//!
//! The stateful front of the engine. A `PowerMapper` owns the current
//! network, answers queries about it and caches the last full analysis
//! until the network changes.

use crate::centrality::CentralityReport;
use crate::community::CommunityReport;
use crate::export::NetworkExport;
use crate::findings::key_findings;
use crate::graph::PowerGraph;
use crate::influence::{InfluenceCalculator, InfluenceRanking, InfluenceWeights};
use crate::ingestor::{IngestReport, Ingestor};
use crate::primitives::{
    MAX_ENTITIES_PER_QUERY, MAX_NETWORK_DEPTH, MAX_PATHS_LIMIT, MIN_RELATIONSHIP_STRENGTH,
};
use crate::storage::NetworkSnapshot;
use crate::structure::StructuralAnalysis;
use crate::{Entity, EntityId, EntityKind, KrystalError, Relationship};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Analysis tunables. Defaults come from `primitives`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_relationship_strength: f64,
    pub max_network_depth: usize,
    pub max_entities_per_query: usize,
    #[serde(skip)]
    pub influence: InfluenceWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_relationship_strength: MIN_RELATIONSHIP_STRENGTH,
            max_network_depth: MAX_NETWORK_DEPTH,
            max_entities_per_query: MAX_ENTITIES_PER_QUERY,
            influence: InfluenceWeights::default(),
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Headline counts of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Entities in the input, before de-duplication.
    pub entity_count: usize,
    /// Relationships in the input, including those that did not become edges.
    pub relationship_count: usize,
    pub network_density: f64,
    pub connected_components: usize,
}

/// Full analysis of the current network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnalysis {
    pub summary: NetworkSummary,
    pub centrality: CentralityReport,
    pub communities: CommunityReport,
    pub influence_rankings: Vec<InfluenceRanking>,
    pub structural_analysis: Option<StructuralAnalysis>,
    pub key_findings: Vec<String>,
}

/// A neighbour of an entity with the connecting relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    #[serde(flatten)]
    pub entity: Entity,
    pub relationship: Relationship,
}

/// Entities along a simple path, endpoints included.
pub type ConnectionPath = Vec<Entity>;

// =============================================================================
// POWER MAPPER
// =============================================================================

/// Stateful power mapping engine.
#[derive(Debug, Clone, Default)]
pub struct PowerMapper {
    config: AnalysisConfig,
    graph: PowerGraph,
    /// Relationship records as given, for export.
    relationships: Vec<Relationship>,
    input_entity_count: usize,
    last_ingest: IngestReport,
    cache: Option<NetworkAnalysis>,
}

impl PowerMapper {
    /// Create an empty mapper.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &PowerGraph {
        &self.graph
    }

    /// Relationship records of the current network, as loaded.
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Entities of the current network in id order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.graph.entities().cloned().collect()
    }

    /// The records of the current network, for persistence.
    #[must_use]
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot::new(self.entities(), self.relationships.clone())
    }

    /// What happened to the last loaded batch.
    #[must_use]
    pub fn last_ingest(&self) -> IngestReport {
        self.last_ingest
    }

    /// Replace the current network without analysing it.
    pub fn load_network(
        &mut self,
        entities: &[Entity],
        relationships: &[Relationship],
    ) -> Result<IngestReport, KrystalError> {
        let (graph, report) = Ingestor::build_graph(
            entities,
            relationships,
            self.config.min_relationship_strength,
            self.config.max_entities_per_query,
        )?;

        self.graph = graph;
        self.relationships = relationships.to_vec();
        self.input_entity_count = entities.len();
        self.last_ingest = report;
        self.cache = None;

        tracing::info!(
            entities = report.entities_added,
            relationships = report.relationships_added,
            skipped = report.skipped(),
            "Network loaded"
        );
        Ok(report)
    }

    /// Replace the current network and analyse it.
    pub fn analyze_network(
        &mut self,
        entities: &[Entity],
        relationships: &[Relationship],
    ) -> Result<NetworkAnalysis, KrystalError> {
        self.load_network(entities, relationships)?;
        Ok(self.analysis().clone())
    }

    /// Analysis of the current network, computed on first use.
    pub fn analysis(&mut self) -> &NetworkAnalysis {
        let analysis = match self.cache.take() {
            Some(cached) => cached,
            None => self.compute_analysis(),
        };
        self.cache.insert(analysis)
    }

    /// The cached analysis, if the network has not changed since.
    #[must_use]
    pub fn cached_analysis(&self) -> Option<&NetworkAnalysis> {
        self.cache.as_ref()
    }

    fn compute_analysis(&self) -> NetworkAnalysis {
        let graph = &self.graph;
        let centrality = CentralityReport::compute(graph);
        let calculator = InfluenceCalculator::new(graph, &self.config.influence);
        let scores = calculator.scores();
        let communities = CommunityReport::compute(graph, &scores);
        let structural_analysis = StructuralAnalysis::compute(graph);
        let key_findings = key_findings(graph, &centrality, &communities);

        let analysis = NetworkAnalysis {
            summary: NetworkSummary {
                entity_count: self.input_entity_count,
                relationship_count: self.relationships.len(),
                network_density: graph.density(),
                connected_components: graph.connected_components().len(),
            },
            centrality,
            communities,
            influence_rankings: calculator.rankings(),
            structural_analysis,
            key_findings,
        };

        tracing::debug!(
            entities = graph.node_count(),
            edges = graph.edge_count(),
            communities = analysis.communities.community_count,
            "Network analysis complete"
        );
        analysis
    }

    /// Simple paths between two entities.
    ///
    /// Paths have at most `max_network_depth` edges and are found depth
    /// first in id order; at most `max_paths` are returned. Unknown endpoints
    /// or identical endpoints give no paths.
    #[must_use]
    pub fn find_connection_paths(
        &self,
        from: &EntityId,
        to: &EntityId,
        max_paths: usize,
    ) -> Vec<ConnectionPath> {
        if from == to || !self.graph.contains(from) || !self.graph.contains(to) {
            return Vec::new();
        }

        let limit = max_paths.min(MAX_PATHS_LIMIT);
        let mut found = Vec::new();
        let mut path = vec![from.clone()];
        let mut visited = BTreeSet::from([from.clone()]);
        self.collect_paths(to, &mut path, &mut visited, &mut found, limit);

        found
            .into_iter()
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.graph.entity(id).cloned())
                    .collect()
            })
            .collect()
    }

    fn collect_paths(
        &self,
        target: &EntityId,
        path: &mut Vec<EntityId>,
        visited: &mut BTreeSet<EntityId>,
        found: &mut Vec<Vec<EntityId>>,
        limit: usize,
    ) {
        let Some(current) = path.last().cloned() else {
            return;
        };
        for (next, _) in self.graph.neighbors(&current) {
            if found.len() >= limit {
                return;
            }
            if visited.contains(next) {
                continue;
            }
            if next == target {
                let mut complete = path.clone();
                complete.push(next.clone());
                found.push(complete);
                continue;
            }
            // one more edge is still needed to reach the target
            if path.len() < self.config.max_network_depth {
                path.push(next.clone());
                visited.insert(next.clone());
                self.collect_paths(target, path, visited, found, limit);
                visited.remove(next);
                path.pop();
            }
        }
    }

    /// Influence score of one entity; 0 when unknown.
    #[must_use]
    pub fn calculate_influence(&self, id: &EntityId) -> f64 {
        InfluenceCalculator::new(&self.graph, &self.config.influence).score(id)
    }

    /// Neighbours of an entity, optionally only over relationships of one
    /// type. Unknown entities have no neighbours.
    #[must_use]
    pub fn get_entity_neighbors(
        &self,
        id: &EntityId,
        relationship_type: Option<&str>,
    ) -> Vec<Neighbor> {
        self.graph
            .neighbors(id)
            .filter(|(_, rel)| relationship_type.is_none_or(|kind| rel.is_kind(kind)))
            .filter_map(|(other, rel)| {
                Some(Neighbor {
                    entity: self.graph.entity(other)?.clone(),
                    relationship: rel.clone(),
                })
            })
            .collect()
    }

    /// Serialize the current network.
    ///
    /// Only `json` (case-insensitive) is supported. `exported_at` is written
    /// verbatim as the analysis timestamp.
    pub fn export_network_data(
        &self,
        format: &str,
        exported_at: &str,
    ) -> Result<String, KrystalError> {
        match format.to_lowercase().as_str() {
            "json" => NetworkExport::new(self.entities(), self.relationships.clone(), exported_at)
                .to_json_pretty(),
            other => Err(KrystalError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Drop the network, the input records and the cached analysis.
    pub fn clear_network(&mut self) {
        self.graph.clear();
        self.relationships.clear();
        self.input_entity_count = 0;
        self.last_ingest = IngestReport::default();
        self.cache = None;
        tracing::debug!("Network cleared");
    }
}

// =============================================================================
// SAMPLE NETWORK
// =============================================================================

/// Entities of the demonstration network.
#[must_use]
pub fn sample_entities() -> Vec<Entity> {
    vec![
        Entity::new(1, "Tech Giant Inc", EntityKind::Corporation).with_sector("technology"),
        Entity::new(2, "Government Agency", EntityKind::Government).with_sector("government"),
        Entity::new(3, "Industry Association", EntityKind::Organization).with_sector("advocacy"),
        Entity::new(4, "Media Conglomerate", EntityKind::Corporation).with_sector("media"),
        Entity::new(5, "Political Figure", EntityKind::Person).with_sector("government"),
    ]
}

/// Relationships of the demonstration network.
#[must_use]
pub fn sample_relationships() -> Vec<Relationship> {
    vec![
        Relationship::new(1, 2, "lobbying", 0.8),
        Relationship::new(1, 3, "membership", 0.9),
        Relationship::new(2, 5, "employment", 0.7),
        Relationship::new(3, 4, "partnership", 0.6),
        Relationship::new(4, 5, "endorsement", 0.5),
    ]
}

/// A mapper loaded with the five-entity demonstration network and analysed.
pub fn create_sample_network() -> Result<PowerMapper, KrystalError> {
    let mut mapper = PowerMapper::default();
    mapper.analyze_network(&sample_entities(), &sample_relationships())?;
    Ok(mapper)
}

// =============================================================================
// TESTS
// =============================================================================
