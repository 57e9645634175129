//! # Structure Module
//!
//! Whole-network structural statistics.

use crate::graph::PowerGraph;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// TYPES
// =============================================================================

/// Longest shortest path, or a marker for a disconnected network.
///
/// Serialized as a number or the string `"Disconnected"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diameter {
    Hops(usize),
    Disconnected,
}

const DISCONNECTED: &str = "Disconnected";

impl Serialize for Diameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Hops(d) => serializer.serialize_u64(*d as u64),
            Self::Disconnected => serializer.serialize_str(DISCONNECTED),
        }
    }
}

impl<'de> Deserialize<'de> for Diameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hops(usize),
            Label(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Hops(d) => Ok(Self::Hops(d)),
            Repr::Label(s) if s == DISCONNECTED => Ok(Self::Disconnected),
            Repr::Label(s) => Err(serde::de::Error::custom(format!(
                "unexpected diameter '{}'",
                s
            ))),
        }
    }
}

/// Spread of entity degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeDistribution {
    pub min: usize,
    pub max: usize,
    /// Upper median: element `len / 2` of the sorted degrees.
    pub median: usize,
}

/// Structural statistics of a non-empty network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralAnalysis {
    pub average_degree: f64,
    pub diameter: Diameter,
    /// Mean local clustering; entities with fewer than two neighbours count
    /// as 0.
    pub average_clustering: f64,
    /// Degree assortativity; `None` when every edge joins equal degrees or
    /// there are no edges.
    pub assortativity: Option<f64>,
    pub degree_distribution: DegreeDistribution,
}

impl StructuralAnalysis {
    /// Analyse the network. `None` for an empty network.
    #[must_use]
    pub fn compute(graph: &PowerGraph) -> Option<Self> {
        if graph.is_empty() {
            return None;
        }

        let degrees: Vec<usize> = graph.ids().map(|id| graph.degree(id)).collect();
        let average_degree = degrees.iter().sum::<usize>() as f64 / degrees.len() as f64;

        let mut sorted = degrees.clone();
        sorted.sort_unstable();
        let degree_distribution = DegreeDistribution {
            min: sorted.first().copied().unwrap_or(0),
            max: sorted.last().copied().unwrap_or(0),
            median: sorted.get(sorted.len() / 2).copied().unwrap_or(0),
        };

        Some(Self {
            average_degree,
            diameter: diameter(graph),
            average_clustering: average_clustering(graph),
            assortativity: degree_assortativity(graph),
            degree_distribution,
        })
    }
}

// =============================================================================
// MEASURES
// =============================================================================

/// Maximum eccentricity over all entities.
#[must_use]
pub fn diameter(graph: &PowerGraph) -> Diameter {
    if !graph.is_connected() {
        return Diameter::Disconnected;
    }
    let view = graph.indexed();
    let longest = (0..view.len())
        .filter_map(|v| view.distances(v).into_iter().flatten().max())
        .max()
        .unwrap_or(0);
    Diameter::Hops(longest)
}

/// Mean of the local clustering coefficients.
#[must_use]
pub fn average_clustering(graph: &PowerGraph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    let view = graph.indexed();
    let total: f64 = (0..view.len())
        .map(|v| {
            let nbrs = &view.adj[v];
            let k = nbrs.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (i, &a) in nbrs.iter().enumerate() {
                for &b in &nbrs[i + 1..] {
                    if view.adj[a].binary_search(&b).is_ok() {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k as f64 * (k as f64 - 1.0))
        })
        .sum();
    total / view.len() as f64
}

/// Pearson correlation of the degrees at either end of every edge.
///
/// Each edge contributes both orientations.
#[must_use]
pub fn degree_assortativity(graph: &PowerGraph) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = graph
        .edges()
        .flat_map(|(a, b, _)| {
            let (da, db) = (graph.degree(a) as f64, graph.degree(b) as f64);
            [(da, db), (db, da)]
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let n = pairs.len() as f64;
    let mean = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean) * (y - mean);
        var += (x - mean) * (x - mean);
    }

    if var.abs() < f64::EPSILON {
        return None;
    }
    Some(cov / var)
}

// =============================================================================
// TESTS
// =============================================================================
