//! # Community Module
//!
//! Louvain community detection and modularity.
//!
//! Nodes are visited in `EntityId` order instead of a shuffled order, so the
//! partition of a given network is always the same. Edges are unweighted.

use crate::graph::{IndexedGraph, PowerGraph};
use crate::primitives::LOUVAIN_RESOLUTION;
use crate::{Entity, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Minimum modularity gain for another aggregation level.
const LEVEL_THRESHOLD: f64 = 1e-7;

// =============================================================================
// REPORT TYPES
// =============================================================================

/// A detected community with its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// 1-based position in the report.
    pub id: usize,
    pub size: usize,
    pub entities: Vec<Entity>,
    /// Mean influence score of the members.
    pub influence_score: f64,
}

/// The community structure of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityReport {
    pub communities: Vec<Community>,
    pub modularity: f64,
    pub community_count: usize,
}

impl CommunityReport {
    /// Detect communities and attach member details.
    ///
    /// - No entities or no relationships: an empty report.
    /// - Fewer than two relationships: one community per entity, modularity 0.
    /// - Otherwise Louvain at resolution 1.
    ///
    /// `influence` supplies per-entity scores for the community averages;
    /// missing entries count as 0.
    #[must_use]
    pub fn compute(graph: &PowerGraph, influence: &BTreeMap<EntityId, f64>) -> Self {
        if graph.is_empty() || graph.edge_count() == 0 {
            return Self::default();
        }

        let (partition, modularity) = if graph.edge_count() < 2 {
            let singletons = graph
                .ids()
                .map(|id| BTreeSet::from([id.clone()]))
                .collect::<Vec<_>>();
            (singletons, 0.0)
        } else {
            let partition = louvain_communities(graph, LOUVAIN_RESOLUTION);
            let q = modularity(graph, &partition, LOUVAIN_RESOLUTION);
            (partition, q)
        };

        let communities: Vec<Community> = partition
            .iter()
            .filter_map(|members| {
                let entities: Vec<Entity> = members
                    .iter()
                    .filter_map(|id| graph.entity(id).cloned())
                    .collect();
                if entities.is_empty() {
                    return None;
                }
                let total: f64 = members
                    .iter()
                    .map(|id| influence.get(id).copied().unwrap_or(0.0))
                    .sum();
                Some((entities, total))
            })
            .enumerate()
            .map(|(i, (entities, total))| Community {
                id: i + 1,
                size: entities.len(),
                influence_score: total / entities.len() as f64,
                entities,
            })
            .collect();

        tracing::debug!(
            count = communities.len(),
            modularity,
            "Community detection complete"
        );

        Self {
            community_count: communities.len(),
            communities,
            modularity,
        }
    }

    /// The community with the most members (first one on a tie).
    #[must_use]
    pub fn largest(&self) -> Option<&Community> {
        let mut best: Option<&Community> = None;
        for community in &self.communities {
            match best {
                Some(top) if community.size <= top.size => {}
                _ => best = Some(community),
            }
        }
        best
    }
}

// =============================================================================
// PUBLIC ALGORITHMS
// =============================================================================

/// Louvain communities, ordered by their smallest member.
#[must_use]
pub fn louvain_communities(graph: &PowerGraph, resolution: f64) -> Vec<BTreeSet<EntityId>> {
    let view = graph.indexed();
    let mut level = Level::from_view(&view);
    let m = level.total_weight();

    let mut members: Vec<Vec<usize>> = (0..view.len()).map(|i| vec![i]).collect();
    if m > 0.0 {
        let mut current = level.modularity(&singleton_groups(level.len()), resolution, m);
        loop {
            let (labels, moved) = level.one_level(m, resolution);
            let groups = group_labels(&labels);
            members = groups
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .flat_map(|&v| members[v].iter().copied())
                        .collect()
                })
                .collect();
            if !moved {
                break;
            }

            let next = level.modularity(&groups, resolution, m);
            if next - current <= LEVEL_THRESHOLD {
                break;
            }
            current = next;
            level = level.aggregate(&groups);
        }
    }

    let mut communities: Vec<BTreeSet<EntityId>> = members
        .into_iter()
        .map(|group| group.into_iter().map(|i| view.ids[i].clone()).collect())
        .collect();
    communities.sort_by(|a, b| a.first().cmp(&b.first()));
    communities
}

/// Modularity of a partition of the network.
///
/// `Q = sum_c [ L_c / m - resolution * (d_c / 2m)^2 ]` where `L_c` is the
/// number of edges inside community `c` and `d_c` its total degree. Zero for
/// a network without edges.
#[must_use]
pub fn modularity(graph: &PowerGraph, partition: &[BTreeSet<EntityId>], resolution: f64) -> f64 {
    let view = graph.indexed();
    let level = Level::from_view(&view);
    let m = level.total_weight();
    if m == 0.0 {
        return 0.0;
    }

    let index: BTreeMap<&EntityId, usize> =
        view.ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let groups: Vec<Vec<usize>> = partition
        .iter()
        .map(|set| set.iter().filter_map(|id| index.get(id).copied()).collect())
        .collect();
    level.modularity(&groups, resolution, m)
}

// =============================================================================
// LEVEL GRAPH
// =============================================================================

/// A weighted graph at one aggregation level.
///
/// Node `i` of an aggregated level stands for a community of the previous
/// level; edges inside it become its self-loop weight.
struct Level {
    adj: Vec<BTreeMap<usize, f64>>,
    self_loops: Vec<f64>,
    degree: Vec<f64>,
}

impl Level {
    fn from_view(view: &IndexedGraph) -> Self {
        let adj: Vec<BTreeMap<usize, f64>> = view
            .adj
            .iter()
            .map(|nbrs| nbrs.iter().map(|&v| (v, 1.0)).collect())
            .collect();
        let self_loops = vec![0.0; view.len()];
        Self::with_degrees(adj, self_loops)
    }

    fn with_degrees(adj: Vec<BTreeMap<usize, f64>>, self_loops: Vec<f64>) -> Self {
        let degree = adj
            .iter()
            .zip(&self_loops)
            .map(|(nbrs, &own)| nbrs.values().sum::<f64>() + 2.0 * own)
            .collect();
        Self {
            adj,
            self_loops,
            degree,
        }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    fn total_weight(&self) -> f64 {
        self.degree.iter().sum::<f64>() / 2.0
    }

    /// Local moving phase. Returns the community label of every node and
    /// whether any node moved.
    fn one_level(&self, m: f64, resolution: f64) -> (Vec<usize>, bool) {
        let n = self.len();
        let mut node2com: Vec<usize> = (0..n).collect();
        let mut stot = self.degree.clone();
        let mut improvement = false;
        let two_m_sq = 2.0 * m * m;

        let mut moves = 1usize;
        while moves > 0 {
            moves = 0;
            for u in 0..n {
                let degree = self.degree[u];
                let mut weights2com: BTreeMap<usize, f64> = BTreeMap::new();
                for (&v, &w) in &self.adj[u] {
                    *weights2com.entry(node2com[v]).or_insert(0.0) += w;
                }

                let current = node2com[u];
                stot[current] -= degree;
                let remove_cost = -weights2com.get(&current).copied().unwrap_or(0.0) / m
                    + resolution * stot[current] * degree / two_m_sq;

                let mut best_gain = 0.0;
                let mut best = current;
                for (&com, &wt) in &weights2com {
                    let gain = remove_cost + wt / m - resolution * stot[com] * degree / two_m_sq;
                    if gain > best_gain {
                        best_gain = gain;
                        best = com;
                    }
                }

                stot[best] += degree;
                if best != current {
                    node2com[u] = best;
                    moves += 1;
                    improvement = true;
                }
            }
        }

        (node2com, improvement)
    }

    fn modularity(&self, groups: &[Vec<usize>], resolution: f64, m: f64) -> f64 {
        let mut community = vec![usize::MAX; self.len()];
        for (c, group) in groups.iter().enumerate() {
            for &v in group {
                community[v] = c;
            }
        }

        groups
            .iter()
            .enumerate()
            .map(|(c, group)| {
                let mut internal = 0.0;
                let mut degree_sum = 0.0;
                for &u in group {
                    internal += self.self_loops[u];
                    degree_sum += self.degree[u];
                    internal += self.adj[u]
                        .iter()
                        .filter(|&(&v, _)| u < v && community[v] == c)
                        .map(|(_, &w)| w)
                        .sum::<f64>();
                }
                internal / m - resolution * (degree_sum / (2.0 * m)).powi(2)
            })
            .sum()
    }

    /// Collapse each group into a single node.
    fn aggregate(&self, groups: &[Vec<usize>]) -> Self {
        let k = groups.len();
        let mut owner = vec![0usize; self.len()];
        for (c, group) in groups.iter().enumerate() {
            for &v in group {
                owner[v] = c;
            }
        }

        let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); k];
        let mut self_loops = vec![0.0; k];
        for u in 0..self.len() {
            let cu = owner[u];
            self_loops[cu] += self.self_loops[u];
            for (&v, &w) in &self.adj[u] {
                if u >= v {
                    continue;
                }
                let cv = owner[v];
                if cu == cv {
                    self_loops[cu] += w;
                } else {
                    *adj[cu].entry(cv).or_insert(0.0) += w;
                    *adj[cv].entry(cu).or_insert(0.0) += w;
                }
            }
        }

        Self::with_degrees(adj, self_loops)
    }
}

fn singleton_groups(n: usize) -> Vec<Vec<usize>> {
    (0..n).map(|i| vec![i]).collect()
}

/// Group node indices by label, ordered by label.
fn group_labels(labels: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (node, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(node);
    }
    groups.into_values().collect()
}

// =============================================================================
// TESTS
// =============================================================================
