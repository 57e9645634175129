//! # Centrality Module
//!
//! Node importance measures over the influence network.
//!
//! All measures are unweighted: relationship strength decides whether an
//! edge exists, not how long it is. Every function returns a score for every
//! entity in `EntityId` order.

use crate::EntityId;
use crate::graph::{IndexedGraph, PowerGraph};
use crate::primitives::{EIGENVECTOR_MAX_ITER, EIGENVECTOR_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Scores keyed by entity.
pub type Scores = BTreeMap<EntityId, f64>;

// =============================================================================
// CENTRALITY REPORT
// =============================================================================

/// The four centrality measures of one analysis.
///
/// Empty when the network has no entities or no relationships; an empty
/// report serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentralityReport {
    #[serde(
        rename = "degree_centrality",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub degree: Scores,
    #[serde(
        rename = "betweenness_centrality",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub betweenness: Scores,
    #[serde(
        rename = "eigenvector_centrality",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub eigenvector: Scores,
    #[serde(
        rename = "closeness_centrality",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub closeness: Scores,
}

impl CentralityReport {
    /// Compute every measure.
    ///
    /// Betweenness is normalised per connected component. Eigenvector
    /// centrality falls back to degree centrality when the graph is
    /// disconnected or the power iteration does not converge.
    #[must_use]
    pub fn compute(graph: &PowerGraph) -> Self {
        if graph.is_empty() || graph.edge_count() == 0 {
            return Self::default();
        }

        let view = graph.indexed();
        let degree = to_scores(&view, degree_values(&view));
        let betweenness = to_scores(&view, component_betweenness_values(&view));

        let eigenvector = if graph.is_connected() && view.len() > 1 {
            match eigenvector_values(&view, EIGENVECTOR_MAX_ITER, EIGENVECTOR_TOLERANCE) {
                Some(values) => to_scores(&view, values),
                None => {
                    tracing::warn!(
                        max_iter = EIGENVECTOR_MAX_ITER,
                        "Eigenvector centrality did not converge, using degree centrality"
                    );
                    degree.clone()
                }
            }
        } else {
            tracing::debug!("Network is disconnected, eigenvector centrality uses degree");
            degree.clone()
        };

        let closeness = to_scores(&view, closeness_values(&view));

        Self {
            degree,
            betweenness,
            eigenvector,
            closeness,
        }
    }

    /// Whether the report carries no scores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.degree.is_empty()
    }

    /// The entity with the highest degree centrality.
    ///
    /// Ties resolve to the smallest id.
    #[must_use]
    pub fn most_central(&self) -> Option<(&EntityId, f64)> {
        let mut best: Option<(&EntityId, f64)> = None;
        for (id, &score) in &self.degree {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((id, score)),
            }
        }
        best
    }
}

// =============================================================================
// PUBLIC MEASURES
// =============================================================================

/// Degree centrality: neighbours divided by `n - 1`.
///
/// A network of one entity scores it 1.
#[must_use]
pub fn degree_centrality(graph: &PowerGraph) -> Scores {
    let view = graph.indexed();
    to_scores(&view, degree_values(&view))
}

/// Betweenness centrality over the whole network, normalised by the total
/// entity count.
#[must_use]
pub fn betweenness_centrality(graph: &PowerGraph) -> Scores {
    let view = graph.indexed();
    let n = view.len();
    let raw = brandes(&view);
    let values = raw
        .into_iter()
        .map(|b| b * normalization(n))
        .collect();
    to_scores(&view, values)
}

/// Eigenvector centrality, or `None` when the power iteration does not
/// converge within `max_iter` rounds.
#[must_use]
pub fn eigenvector_centrality(graph: &PowerGraph, max_iter: usize, tol: f64) -> Option<Scores> {
    let view = graph.indexed();
    eigenvector_values(&view, max_iter, tol).map(|values| to_scores(&view, values))
}

/// Closeness centrality with the Wasserman-Faust correction for
/// disconnected networks.
#[must_use]
pub fn closeness_centrality(graph: &PowerGraph) -> Scores {
    let view = graph.indexed();
    to_scores(&view, closeness_values(&view))
}

// =============================================================================
// ALGORITHMS (indexed)
// =============================================================================

fn to_scores(view: &IndexedGraph, values: Vec<f64>) -> Scores {
    view.ids.iter().cloned().zip(values).collect()
}

fn degree_values(view: &IndexedGraph) -> Vec<f64> {
    let n = view.len();
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 1.0 / (n as f64 - 1.0);
    view.adj.iter().map(|nbrs| nbrs.len() as f64 * scale).collect()
}

/// Factor turning raw Brandes sums (each pair counted from both ends) into
/// the fraction of pairs routed through a node.
fn normalization(n: usize) -> f64 {
    if n <= 2 {
        return 0.0;
    }
    1.0 / ((n as f64 - 1.0) * (n as f64 - 2.0))
}

/// Brandes accumulation from every source.
fn brandes(view: &IndexedGraph) -> Vec<f64> {
    let n = view.len();
    let mut centrality = vec![0.0; n];

    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0f64; n];
        let mut dist: Vec<Option<usize>> = vec![None; n];
        sigma[s] = 1.0;
        dist[s] = Some(0);

        let mut queue = VecDeque::new();
        queue.push_back(s);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            let dv = dist[v].unwrap_or(0);
            for &w in &view.adj[v] {
                if dist[w].is_none() {
                    dist[w] = Some(dv + 1);
                    queue.push_back(w);
                }
                if dist[w] == Some(dv + 1) {
                    sigma[w] += sigma[v];
                    preds[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0f64; n];
        while let Some(w) = stack.pop() {
            for &v in &preds[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    centrality
}

/// Betweenness normalised by the size of each node's own component.
fn component_betweenness_values(view: &IndexedGraph) -> Vec<f64> {
    let raw = brandes(view);
    let mut values = vec![0.0; view.len()];
    let mut assigned = vec![false; view.len()];

    for start in 0..view.len() {
        if assigned[start] {
            continue;
        }
        let members: Vec<usize> = view
            .distances(start)
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.map(|_| i))
            .collect();
        let scale = normalization(members.len());
        for &m in &members {
            assigned[m] = true;
            values[m] = raw[m] * scale;
        }
    }

    values
}

/// Power iteration on `A + I`, starting from the uniform vector.
fn eigenvector_values(view: &IndexedGraph, max_iter: usize, tol: f64) -> Option<Vec<f64>> {
    let n = view.len();
    if n == 0 {
        return Some(Vec::new());
    }

    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..max_iter {
        let last = x.clone();
        for (v, nbrs) in view.adj.iter().enumerate() {
            for &w in nbrs {
                x[w] += last[v];
            }
        }

        let norm = x.iter().map(|z| z * z).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for z in &mut x {
            *z /= norm;
        }

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * tol {
            return Some(x);
        }
    }

    None
}

fn closeness_values(view: &IndexedGraph) -> Vec<f64> {
    let n = view.len();
    (0..n)
        .map(|v| {
            let dist = view.distances(v);
            let reachable: Vec<usize> = dist.iter().flatten().copied().collect();
            let total: usize = reachable.iter().sum();
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let r = reachable.len() as f64 - 1.0;
            (r / total as f64) * (r / (n as f64 - 1.0))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, EntityKind, Relationship};

    const EPS: f64 = 1e-9;

    fn graph_from(n: u64, edges: &[(u64, u64)]) -> PowerGraph {
        let mut graph = PowerGraph::new();
        for i in 1..=n {
            graph
                .insert_entity(Entity::new(i, format!("E{}", i), EntityKind::Person))
                .expect("insert");
        }
        for &(a, b) in edges {
            graph.insert_relationship(Relationship::new(a, b, "link", 0.5));
        }
        graph
    }

    fn score(scores: &Scores, id: u64) -> f64 {
        scores.get(&EntityId::from(id)).copied().unwrap_or(f64::NAN)
    }

    #[test]
    fn empty_or_edgeless_graph_gives_empty_report() {
        assert!(CentralityReport::compute(&PowerGraph::new()).is_empty());
        assert!(CentralityReport::compute(&graph_from(3, &[])).is_empty());
    }

    #[test]
    fn empty_report_serializes_as_empty_object() {
        let json = serde_json::to_string(&CentralityReport::default()).expect("json");
        assert_eq!(json, "{}");
    }

    #[test]
    fn degree_of_star() {
        let graph = graph_from(4, &[(1, 2), (1, 3), (1, 4)]);
        let degree = degree_centrality(&graph);
        assert!((score(&degree, 1) - 1.0).abs() < EPS);
        assert!((score(&degree, 2) - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn lone_entity_degree_is_one() {
        let degree = degree_centrality(&graph_from(1, &[]));
        assert_eq!(score(&degree, 1), 1.0);
    }

    #[test]
    fn betweenness_of_path() {
        // 1 - 2 - 3: node 2 lies on the only 1..3 path
        let graph = graph_from(3, &[(1, 2), (2, 3)]);
        let btw = betweenness_centrality(&graph);
        assert!((score(&btw, 2) - 1.0).abs() < EPS);
        assert!(score(&btw, 1).abs() < EPS);
    }

    #[test]
    fn betweenness_of_star_center() {
        let graph = graph_from(5, &[(1, 2), (1, 3), (1, 4), (1, 5)]);
        let btw = betweenness_centrality(&graph);
        assert!((score(&btw, 1) - 1.0).abs() < EPS);
    }

    #[test]
    fn betweenness_of_cycle_is_uniform() {
        let graph = graph_from(5, &[(1, 2), (2, 3), (3, 4), (4, 5), (5, 1)]);
        let btw = betweenness_centrality(&graph);
        // each node carries one of the two shortest routes between its neighbours
        for id in 1..=5 {
            assert!((score(&btw, id) - 1.0 / 6.0).abs() < EPS);
        }
    }

    #[test]
    fn betweenness_normalised_per_component() {
        // path 1-2-3 plus a separate pair 4-5
        let graph = graph_from(5, &[(1, 2), (2, 3), (4, 5)]);
        let report = CentralityReport::compute(&graph);
        assert!((score(&report.betweenness, 2) - 1.0).abs() < EPS);
        assert_eq!(score(&report.betweenness, 4), 0.0);

        // whole-network normalisation divides by (n-1)(n-2) with n = 5
        let global = betweenness_centrality(&graph);
        assert!((score(&global, 2) - 2.0 / 12.0).abs() < EPS);
    }

    #[test]
    fn eigenvector_of_cycle_is_uniform() {
        let graph = graph_from(4, &[(1, 2), (2, 3), (3, 4), (4, 1)]);
        let eig = eigenvector_centrality(&graph, EIGENVECTOR_MAX_ITER, EIGENVECTOR_TOLERANCE)
            .expect("converges");
        for id in 1..=4 {
            assert!((score(&eig, id) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn eigenvector_favours_hub() {
        let graph = graph_from(4, &[(1, 2), (1, 3), (1, 4)]);
        let report = CentralityReport::compute(&graph);
        assert!(score(&report.eigenvector, 1) > score(&report.eigenvector, 2));
    }

    #[test]
    fn eigenvector_falls_back_to_degree_when_disconnected() {
        let graph = graph_from(4, &[(1, 2), (3, 4)]);
        let report = CentralityReport::compute(&graph);
        assert_eq!(report.eigenvector, report.degree);
    }

    #[test]
    fn eigenvector_without_iterations_fails() {
        let graph = graph_from(2, &[(1, 2)]);
        assert!(eigenvector_centrality(&graph, 0, EIGENVECTOR_TOLERANCE).is_none());
    }

    #[test]
    fn closeness_of_path() {
        let graph = graph_from(3, &[(1, 2), (2, 3)]);
        let closeness = closeness_centrality(&graph);
        assert!((score(&closeness, 2) - 1.0).abs() < EPS);
        assert!((score(&closeness, 1) - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn closeness_scaled_for_disconnected() {
        // pair 1-2 plus isolated 3: r = 2, n = 3
        let graph = graph_from(3, &[(1, 2)]);
        let closeness = closeness_centrality(&graph);
        assert!((score(&closeness, 1) - 0.5).abs() < EPS);
        assert_eq!(score(&closeness, 3), 0.0);
    }

    #[test]
    fn most_central_prefers_smallest_id_on_tie() {
        let graph = graph_from(4, &[(1, 2), (3, 4)]);
        let report = CentralityReport::compute(&graph);
        let (id, _) = report.most_central().expect("non-empty");
        assert_eq!(id, &EntityId::from(1));
    }
}
