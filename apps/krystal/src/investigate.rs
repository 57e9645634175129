//! # Investigation Pipeline
//!
//! Turns a news query into an analysed power network:
//!
//! 1. Fetch up to three articles about the query
//! 2. Search LittleSis for matching entities
//! 3. Fetch connections of the first five entities
//! 4. Add connection counterparts as entities
//! 5. Analyse the network
//!
//! Collection is async and lock-free; analysis runs on a mapper the caller
//! owns, so the HTTP API holds its write lock only for step 5.

use crate::sources::{Article, DataSources};
use krystal_core::{Entity, EntityId, KrystalError, NetworkAnalysis, PowerMapper, Relationship};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Articles fetched per investigation.
pub const MAX_ARTICLES: usize = 3;

/// Entities whose connections are followed.
pub const MAX_CONNECTED_ENTITIES: usize = 5;

/// LittleSis search page size.
const SEARCH_PAGE_SIZE: u32 = 20;

// =============================================================================
// TYPES
// =============================================================================

/// Records gathered for one query, not yet analysed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedNetwork {
    pub query: String,
    pub articles: Vec<Article>,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// Result of an investigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigation {
    pub query: String,
    /// The lead article, or a placeholder titled with the query.
    pub article: Article,
    pub articles: Vec<Article>,
    pub analysis: NetworkAnalysis,
    pub analyzed_at: String,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Gather articles, entities and relationships for `query`.
pub async fn collect_network(sources: &DataSources, query: &str) -> CollectedNetwork {
    let articles = sources.news.search_news(query, MAX_ARTICLES, "en").await;
    let mut entities = sources
        .littlesis
        .search_entities(query, 1, SEARCH_PAGE_SIZE)
        .await;

    let mut known: BTreeSet<EntityId> = entities.iter().filter_map(|e| e.id.clone()).collect();
    let mut relationships = Vec::new();
    let mut counterparts = Vec::new();

    let followed: Vec<u64> = entities
        .iter()
        .take(MAX_CONNECTED_ENTITIES)
        .filter_map(|e| e.id.as_ref()?.as_str().parse().ok())
        .collect();
    for entity_id in followed {
        for connection in sources
            .littlesis
            .get_entity_connections(entity_id, &[])
            .await
        {
            let other = connection.counterpart(entity_id);
            if let Some(id) = &other.id
                && known.insert(id.clone())
            {
                counterparts.push(other);
            }
            relationships.push(connection.to_relationship(entity_id));
        }
    }
    entities.extend(counterparts);

    tracing::info!(
        query = query,
        articles = articles.len(),
        entities = entities.len(),
        relationships = relationships.len(),
        "Investigation data collected"
    );

    CollectedNetwork {
        query: query.to_string(),
        articles,
        entities,
        relationships,
    }
}

/// Analyse collected records on `mapper`, replacing its network.
pub fn analyze_collected(
    mapper: &mut PowerMapper,
    collected: CollectedNetwork,
    analyzed_at: String,
) -> Result<Investigation, KrystalError> {
    let analysis = mapper.analyze_network(&collected.entities, &collected.relationships)?;
    let article = collected
        .articles
        .first()
        .cloned()
        .unwrap_or_else(|| Article::titled(collected.query.clone()));

    Ok(Investigation {
        query: collected.query,
        article,
        articles: collected.articles,
        analysis,
        analyzed_at,
    })
}

/// Collect and analyse in one step.
pub async fn investigate(
    sources: &DataSources,
    mapper: &mut PowerMapper,
    query: &str,
) -> Result<Investigation, KrystalError> {
    let collected = collect_network(sources, query).await;
    analyze_collected(mapper, collected, chrono::Utc::now().to_rfc3339())
}

// =============================================================================
// TESTS
// =============================================================================
