//! # Influence Network
//!
//! The undirected graph the analyses run on.
//!
//! All data structures use `BTreeMap` for deterministic ordering: neighbour
//! iteration, component order and every derived report follow `EntityId`
//! order.

use crate::{Entity, EntityId, KrystalError, Relationship};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// An undirected influence network.
///
/// Each edge is stored in both directions and carries the `Relationship`
/// record that created it. There is at most one edge per pair of entities;
/// re-inserting replaces the stored relationship.
#[derive(Debug, Clone, Default)]
pub struct PowerGraph {
    /// Node storage: EntityId -> Entity
    entities: BTreeMap<EntityId, Entity>,

    /// Adjacency: entity -> (neighbour -> relationship)
    adjacency: BTreeMap<EntityId, BTreeMap<EntityId, Relationship>>,
}

impl PowerGraph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity. The entity must carry an id.
    pub fn insert_entity(&mut self, entity: Entity) -> Result<EntityId, KrystalError> {
        let id = entity.id.clone().ok_or_else(|| {
            KrystalError::InvalidEntity(format!("entity '{}' has no id", entity.name))
        })?;
        self.adjacency.entry(id.clone()).or_default();
        self.entities.insert(id.clone(), entity);
        Ok(id)
    }

    /// Insert an undirected edge for a relationship.
    ///
    /// Returns `false` (and changes nothing) when either endpoint is unknown
    /// or both endpoints are the same entity.
    pub fn insert_relationship(&mut self, relationship: Relationship) -> bool {
        let (a, b) = (&relationship.source, &relationship.target);
        if a == b || !self.entities.contains_key(a) || !self.entities.contains_key(b) {
            return false;
        }
        let (a, b) = (a.clone(), b.clone());
        self.adjacency
            .entry(b.clone())
            .or_default()
            .insert(a.clone(), relationship.clone());
        self.adjacency
            .entry(a)
            .or_default()
            .insert(b, relationship);
        true
    }

    /// Look up an entity.
    #[must_use]
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Check whether the entity is part of the network.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All entity ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    /// Neighbours of an entity with the connecting relationship.
    pub fn neighbors<'a>(
        &'a self,
        id: &EntityId,
    ) -> impl Iterator<Item = (&'a EntityId, &'a Relationship)> + use<'a> {
        self.adjacency
            .get(id)
            .into_iter()
            .flat_map(|targets| targets.iter())
    }

    /// Number of neighbours of an entity (0 when unknown).
    #[must_use]
    pub fn degree(&self, id: &EntityId) -> usize {
        self.adjacency.get(id).map_or(0, BTreeMap::len)
    }

    /// The relationship connecting two entities, if any.
    #[must_use]
    pub fn edge(&self, a: &EntityId, b: &EntityId) -> Option<&Relationship> {
        self.adjacency.get(a)?.get(b)
    }

    /// Every edge once, as `(lower id, higher id, relationship)`.
    pub fn edges(&self) -> impl Iterator<Item = (&EntityId, &EntityId, &Relationship)> + '_ {
        self.adjacency.iter().flat_map(|(a, targets)| {
            targets
                .iter()
                .filter(move |(b, _)| a < *b)
                .map(move |(b, rel)| (a, b, rel))
        })
    }

    /// Total number of entities.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    /// Total number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Check if the graph has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Edge density `2m / n(n-1)`; 0 for fewer than two entities.
    #[must_use]
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n <= 1 {
            return 0.0;
        }
        let m = self.edge_count() as f64;
        2.0 * m / (n as f64 * (n as f64 - 1.0))
    }

    /// Connected components, each sorted, ordered by their smallest id.
    #[must_use]
    pub fn connected_components(&self) -> Vec<BTreeSet<EntityId>> {
        let mut seen: BTreeSet<EntityId> = BTreeSet::new();
        let mut components = Vec::new();

        for start in self.entities.keys() {
            if seen.contains(start) {
                continue;
            }
            let component: BTreeSet<EntityId> = self.bfs_distances(start).into_keys().collect();
            seen.extend(component.iter().cloned());
            components.push(component);
        }

        components
    }

    /// Whether every entity is reachable from every other.
    ///
    /// An empty graph is not connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match self.entities.keys().next() {
            Some(first) => self.bfs_distances(first).len() == self.node_count(),
            None => false,
        }
    }

    /// Hop distances from `start` to every reachable entity (itself included).
    #[must_use]
    pub fn bfs_distances(&self, start: &EntityId) -> BTreeMap<EntityId, usize> {
        let mut dist = BTreeMap::new();
        if !self.contains(start) {
            return dist;
        }

        let mut queue = VecDeque::new();
        dist.insert(start.clone(), 0usize);
        queue.push_back(start.clone());

        while let Some(current) = queue.pop_front() {
            let d = dist.get(&current).copied().unwrap_or(0);
            for (neighbor, _) in self.neighbors(&current) {
                if !dist.contains_key(neighbor) {
                    dist.insert(neighbor.clone(), d.saturating_add(1));
                    queue.push_back(neighbor.clone());
                }
            }
        }

        dist
    }

    /// Remove every entity and edge.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.adjacency.clear();
    }

    /// Dense index view used by the numeric algorithms.
    #[must_use]
    pub(crate) fn indexed(&self) -> IndexedGraph {
        let ids: Vec<EntityId> = self.entities.keys().cloned().collect();
        let index: BTreeMap<&EntityId, usize> =
            ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
        let adj = ids
            .iter()
            .map(|id| {
                self.neighbors(id)
                    .filter_map(|(n, _)| index.get(n).copied())
                    .collect()
            })
            .collect();
        IndexedGraph { ids, adj }
    }
}

// =============================================================================
// INDEXED VIEW
// =============================================================================

/// Entities mapped to `0..n` with sorted adjacency lists.
///
/// Index order equals `EntityId` order.
#[derive(Debug, Clone)]
pub(crate) struct IndexedGraph {
    pub ids: Vec<EntityId>,
    pub adj: Vec<Vec<usize>>,
}

impl IndexedGraph {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Unweighted single-source distances; `None` when unreachable.
    pub fn distances(&self, source: usize) -> Vec<Option<usize>> {
        let mut dist = vec![None; self.len()];
        let mut queue = VecDeque::new();
        dist[source] = Some(0);
        queue.push_back(source);

        while let Some(v) = queue.pop_front() {
            let dv = dist[v].unwrap_or(0);
            for &w in &self.adj[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
            }
        }

        dist
    }
}

// =============================================================================
// TESTS
// =============================================================================
