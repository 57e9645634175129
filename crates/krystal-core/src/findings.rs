//! Human-readable key findings.

use crate::centrality::CentralityReport;
use crate::community::CommunityReport;
use crate::graph::PowerGraph;
use crate::primitives::{DENSE_NETWORK_THRESHOLD, SPARSE_NETWORK_THRESHOLD};

/// Returned alone when there is nothing to analyse.
pub const INSUFFICIENT_DATA: &str = "Insufficient data for detailed analysis";

/// Summarise an analysis in a few sentences.
///
/// Order: most central entity, community count, largest community, density
/// band.
#[must_use]
pub fn key_findings(
    graph: &PowerGraph,
    centrality: &CentralityReport,
    communities: &CommunityReport,
) -> Vec<String> {
    if centrality.is_empty() {
        return vec![INSUFFICIENT_DATA.to_string()];
    }

    let mut findings = Vec::new();

    if let Some((id, score)) = centrality.most_central() {
        let name = graph
            .entity(id)
            .map(|e| e.display_name())
            .unwrap_or_else(|| format!("Entity {}", id));
        findings.push(format!(
            "Most central entity: {} (centrality: {:.3})",
            name, score
        ));
    }

    if let Some(largest) = communities.largest() {
        findings.push(format!(
            "Network divided into {} communities",
            communities.community_count
        ));
        findings.push(format!("Largest community has {} entities", largest.size));
    }

    if !graph.is_empty() {
        let density = graph.density();
        let band = if density > DENSE_NETWORK_THRESHOLD {
            "Highly interconnected network (dense structure)"
        } else if density < SPARSE_NETWORK_THRESHOLD {
            "Sparse network with limited connections"
        } else {
            "Moderately connected network"
        };
        findings.push(band.to_string());
    }

    findings
}
