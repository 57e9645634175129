//! # Influence Module
//!
//! Multi-factor influence scoring.
//!
//! ```text
//! score = min(100, (w_deg * degree + w_btw * betweenness) * 100 * type_multiplier)
//! ```
//!
//! Degree and betweenness are taken over the whole network. The type
//! multiplier is the institutional authority weight of the entity's kind.

use crate::centrality::{Scores, betweenness_centrality, degree_centrality};
use crate::graph::PowerGraph;
use crate::{Entity, EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound of every influence score.
pub const MAX_INFLUENCE: f64 = 100.0;

// =============================================================================
// WEIGHTS
// =============================================================================

/// Tunable factors of the influence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceWeights {
    pub degree_weight: f64,
    pub betweenness_weight: f64,
    /// Overrides keyed by lower-case kind label (`"corporation"`, ...).
    /// Kinds without an entry use `EntityKind::default_multiplier`.
    pub type_multipliers: BTreeMap<String, f64>,
}

impl Default for InfluenceWeights {
    fn default() -> Self {
        Self {
            degree_weight: 0.4,
            betweenness_weight: 0.6,
            type_multipliers: BTreeMap::new(),
        }
    }
}

impl InfluenceWeights {
    /// Authority weight applied to an entity of this kind.
    #[must_use]
    pub fn multiplier(&self, kind: &EntityKind) -> f64 {
        self.type_multipliers
            .get(&kind.as_str().to_lowercase())
            .copied()
            .unwrap_or_else(|| kind.default_multiplier())
    }
}

// =============================================================================
// RANKINGS
// =============================================================================

/// An entity record with its influence score attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceRanking {
    #[serde(flatten)]
    pub entity: Entity,
    pub influence_score: f64,
}

/// Scores entities of one network.
///
/// Centrality is computed once at construction, so scoring many entities
/// costs one Brandes pass in total.
pub struct InfluenceCalculator<'a> {
    graph: &'a PowerGraph,
    weights: &'a InfluenceWeights,
    degree: Scores,
    betweenness: Scores,
}

impl<'a> InfluenceCalculator<'a> {
    #[must_use]
    pub fn new(graph: &'a PowerGraph, weights: &'a InfluenceWeights) -> Self {
        Self {
            graph,
            weights,
            degree: degree_centrality(graph),
            betweenness: betweenness_centrality(graph),
        }
    }

    /// Influence of one entity; 0 when it is not in the network.
    #[must_use]
    pub fn score(&self, id: &EntityId) -> f64 {
        let Some(entity) = self.graph.entity(id) else {
            return 0.0;
        };
        let degree = self.degree.get(id).copied().unwrap_or(0.0);
        let betweenness = self.betweenness.get(id).copied().unwrap_or(0.0);
        let base = (degree * self.weights.degree_weight
            + betweenness * self.weights.betweenness_weight)
            * 100.0;
        (base * self.weights.multiplier(&entity.kind)).min(MAX_INFLUENCE)
    }

    /// Influence of every entity, in id order.
    #[must_use]
    pub fn scores(&self) -> BTreeMap<EntityId, f64> {
        self.graph
            .ids()
            .map(|id| (id.clone(), self.score(id)))
            .collect()
    }

    /// Every entity with its score, highest first; ties keep id order.
    #[must_use]
    pub fn rankings(&self) -> Vec<InfluenceRanking> {
        let mut rankings: Vec<InfluenceRanking> = self
            .graph
            .entities()
            .filter_map(|entity| {
                let id = entity.id.as_ref()?;
                Some(InfluenceRanking {
                    influence_score: self.score(id),
                    entity: entity.clone(),
                })
            })
            .collect();
        rankings.sort_by(|a, b| b.influence_score.total_cmp(&a.influence_score));
        rankings
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Relationship;

    fn star(center_kind: EntityKind) -> PowerGraph {
        let mut graph = PowerGraph::new();
        graph
            .insert_entity(Entity::new(1, "Hub", center_kind))
            .expect("insert");
        for i in 2..=4 {
            graph
                .insert_entity(Entity::new(i, format!("Leaf {}", i), EntityKind::Organization))
                .expect("insert");
            graph.insert_relationship(Relationship::new(1, i, "link", 0.5));
        }
        graph
    }

    #[test]
    fn hub_score_is_capped() {
        let graph = star(EntityKind::Government);
        let weights = InfluenceWeights::default();
        let calc = InfluenceCalculator::new(&graph, &weights);
        // degree 1, betweenness 1: 100 * 1.3 capped
        assert_eq!(calc.score(&EntityId::from(1)), MAX_INFLUENCE);
    }

    #[test]
    fn leaf_score_uses_degree_only() {
        let graph = star(EntityKind::Organization);
        let weights = InfluenceWeights::default();
        let calc = InfluenceCalculator::new(&graph, &weights);
        let expected = 0.4 * (1.0 / 3.0) * 100.0;
        assert!((calc.score(&EntityId::from(2)) - expected).abs() < 1e-9);
    }

    #[test]
    fn unknown_entity_scores_zero() {
        let graph = star(EntityKind::Person);
        let weights = InfluenceWeights::default();
        let calc = InfluenceCalculator::new(&graph, &weights);
        assert_eq!(calc.score(&EntityId::from("ghost")), 0.0);
    }

    #[test]
    fn multiplier_override_applies() {
        let mut weights = InfluenceWeights::default();
        weights
            .type_multipliers
            .insert("organization".to_string(), 2.0);
        assert_eq!(weights.multiplier(&EntityKind::Organization), 2.0);
        assert_eq!(weights.multiplier(&EntityKind::Government), 1.3);
        assert_eq!(
            weights.multiplier(&EntityKind::Other("Think Tank".into())),
            1.0
        );
    }

    #[test]
    fn rankings_sorted_descending_with_stable_ties() {
        let graph = star(EntityKind::Corporation);
        let weights = InfluenceWeights::default();
        let rankings = InfluenceCalculator::new(&graph, &weights).rankings();

        assert_eq!(rankings.len(), 4);
        assert_eq!(rankings[0].entity.id, Some(EntityId::from(1)));
        let leaves: Vec<_> = rankings[1..]
            .iter()
            .filter_map(|r| r.entity.id.clone())
            .collect();
        assert_eq!(
            leaves,
            vec![EntityId::from(2), EntityId::from(3), EntityId::from(4)]
        );
    }

    #[test]
    fn ranking_serializes_flat() {
        let graph = star(EntityKind::Person);
        let weights = InfluenceWeights::default();
        let rankings = InfluenceCalculator::new(&graph, &weights).rankings();
        let json = serde_json::to_value(&rankings[0]).expect("json");

        assert_eq!(json["name"], "Hub");
        assert_eq!(json["type"], "person");
        assert!(json["influence_score"].is_number());
    }
}
