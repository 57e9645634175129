//! Integration tests for the data-source clients.
//!
//! Live calls go to a local axum stand-in for each service, or to a closed
//! port to exercise degradation.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use krystal::config::SourcesConfig;
use krystal::investigate::collect_network;
use krystal::sources::{
    ClientOptions, DataSources, LittleSisClient, NewsClient, OpenSecretsClient,
};
use krystal_core::EntityKind;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Nothing listens on the discard port.
const CLOSED: &str = "http://127.0.0.1:9";

fn options() -> ClientOptions {
    ClientOptions {
        cache_ttl: Duration::from_secs(60),
        request_timeout: Duration::from_secs(2),
    }
}

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// =============================================================================
// FAKE SERVICES
// =============================================================================

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer ls-key")
}

async fn littlesis_search(
    State(hits): State<Hits>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    hits.bump();
    if !bearer_ok(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    let q = params.get("q").cloned().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({"data": [
            {"type": "entities", "id": "15", "attributes": {
                "name": format!("{} Holdings", q), "primary_ext": "Org", "blurb": "A holding company"
            }},
            {"type": "entities", "id": "16", "attributes": {
                "name": "Jane Doe", "primary_ext": "Person"
            }},
            {"type": "entities", "attributes": {"primary_ext": "Person"}}
        ]})),
    )
}

async fn littlesis_relationships(State(hits): State<Hits>) -> Json<Value> {
    hits.bump();
    Json(json!({"data": [
        {"type": "relationships", "id": "900", "attributes": {
            "entity1_id": 15, "entity2_id": 16, "category_id": 1, "description1": "Director"
        }},
        {"type": "relationships", "id": "901", "attributes": {
            "entity1_id": 15, "entity2_id": 77, "category_id": 5
        }}
    ]}))
}

fn littlesis_router(hits: Hits) -> Router {
    Router::new()
        .route("/entities", get(littlesis_search))
        .route("/entity/{id}/relationships", get(littlesis_relationships))
        .with_state(hits)
}

async fn news_everything(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("news-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status": "error"})));
    }
    (
        StatusCode::OK,
        Json(json!({"status": "ok", "articles": [
            {"source": {"name": "Wire"}, "title": "Senate questions Amazon",
             "url": "https://w/1", "publishedAt": "2024-03-01T00:00:00Z", "content": "Hearing"},
            {"source": {"name": "Wire"}, "title": "Second story", "url": "https://w/2"},
            {"source": {"name": "Wire"}, "title": "Third story", "url": "https://w/3"},
            {"source": {"name": "Wire"}, "title": "Fourth story", "url": "https://w/4"}
        ]})),
    )
}

async fn rate_limited() -> (StatusCode, Json<Value>) {
    (StatusCode::TOO_MANY_REQUESTS, Json(json!({"status": "error"})))
}

async fn opensecrets(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if params.get("apikey").map(String::as_str) != Some("os-key") {
        return (StatusCode::FORBIDDEN, Json(json!({})));
    }
    let body = match params.get("method").map(String::as_str) {
        Some("orgSummary") => json!({"response": {"organization": {"@attributes": {
            "orgid": "D1", "orgname": "Acme", "lobbying": "1200.4", "total": 300
        }}}}),
        Some("candSummary") => json!({"response": {"summary": {"@attributes": {
            "cand_name": "Doe", "total": "99000"
        }}}}),
        Some("candContrib") => json!({"response": {"contributors": {"contributor": [
            {"@attributes": {"org_name": "Acme", "total": "5000"}}
        ]}}}),
        _ => return (StatusCode::BAD_REQUEST, Json(json!({}))),
    };
    (StatusCode::OK, Json(body))
}

// =============================================================================
// LITTLESIS
// =============================================================================

#[tokio::test]
async fn littlesis_live_search_decodes_resources() {
    let hits = Hits::default();
    let base = spawn(littlesis_router(hits.clone())).await;
    let client = LittleSisClient::with_base_url(Some("ls-key".to_string()), &base, &options());

    let entities = client.search_entities("Acme", 1, 20).await;

    // the record without id or name is skipped
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].name, "Acme Holdings");
    assert_eq!(entities[0].id.as_ref().unwrap().as_str(), "15");
    assert_eq!(entities[0].kind, EntityKind::Organization);
    assert_eq!(entities[0].description.as_deref(), Some("A holding company"));
    assert_eq!(entities[1].kind, EntityKind::Person);
    assert_eq!(entities[0].metadata["source"], "littlesis");
}

#[tokio::test]
async fn littlesis_responses_are_cached() {
    let hits = Hits::default();
    let base = spawn(littlesis_router(hits.clone())).await;
    let client = LittleSisClient::with_base_url(Some("ls-key".to_string()), &base, &options());

    client.search_entities("Acme", 1, 20).await;
    client.search_entities("Acme", 1, 20).await;
    assert_eq!(hits.count(), 1);

    client.search_entities("Other", 1, 20).await;
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn littlesis_wrong_key_degrades_to_empty() {
    let base = spawn(littlesis_router(Hits::default())).await;
    let client = LittleSisClient::with_base_url(Some("wrong".to_string()), &base, &options());

    assert!(client.search_entities("Acme", 1, 20).await.is_empty());
}

#[tokio::test]
async fn littlesis_categories_become_relationship_types() {
    let base = spawn(littlesis_router(Hits::default())).await;
    let client = LittleSisClient::with_base_url(Some("ls-key".to_string()), &base, &options());

    let all = client.get_entity_connections(15, &[]).await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].relationship_type, "position");
    assert_eq!(all[0].description.as_deref(), Some("Director"));
    assert_eq!(all[1].relationship_type, "donation");

    let donations = client
        .get_entity_connections(15, &["donation".to_string()])
        .await;
    assert_eq!(donations.len(), 1);
    assert_eq!(donations[0].entity2_id, 77);

    let rel = donations[0].to_relationship(15);
    assert_eq!(rel.source.as_str(), "15");
    assert_eq!(rel.target.as_str(), "77");
    assert!(rel.is_kind("donation"));
}

#[tokio::test]
async fn littlesis_unreachable_degrades() {
    let client = LittleSisClient::with_base_url(Some("ls-key".to_string()), CLOSED, &options());

    assert!(client.search_entities("Acme", 1, 20).await.is_empty());
    assert!(client.get_entity_connections(1, &[]).await.is_empty());
    assert!(client.get_entity_details(1).await.is_none());
}

// =============================================================================
// NEWS
// =============================================================================

#[tokio::test]
async fn news_live_search_truncates_and_extracts() {
    let base = spawn(Router::new().route("/everything", get(news_everything))).await;
    let client = NewsClient::with_base_url(Some("news-key".to_string()), &base, &options());

    let articles = client.search_news("amazon", 3, "en").await;
    assert_eq!(articles.len(), 3);
    assert_eq!(articles[0].source, "Wire");
    assert_eq!(
        articles[0].entities,
        vec!["Technology Corporation", "Government Entity"]
    );
}

#[tokio::test]
async fn news_rate_limit_degrades_to_empty() {
    let base = spawn(
        Router::new()
            .route("/everything", get(rate_limited))
            .route("/top-headlines", get(rate_limited)),
    )
    .await;
    let client = NewsClient::with_base_url(Some("news-key".to_string()), &base, &options());

    assert!(client.search_news("x", 5, "en").await.is_empty());
    assert!(client.get_trending_topics("business").await.is_empty());
}

// =============================================================================
// OPENSECRETS
// =============================================================================

#[tokio::test]
async fn opensecrets_live_calls_parse_attributes() {
    let base = spawn(Router::new().route("/", get(opensecrets))).await;
    let client = OpenSecretsClient::with_base_url(Some("os-key".to_string()), &base, &options());

    let summary = client.get_organization_summary("D1").await.unwrap();
    assert_eq!(summary.name, "Acme");
    assert_eq!(summary.total_lobbying, 1200);
    assert_eq!(summary.total_contributions, 300);

    let funding = client.get_candidate_funding("N1", "2022").await.unwrap();
    assert_eq!(funding.total_raised, 99_000);
    assert_eq!(funding.cycle, "2022");
    assert_eq!(funding.top_contributors.len(), 1);
    assert_eq!(funding.top_contributors[0].amount, 5000);
}

#[tokio::test]
async fn opensecrets_rejected_key_gives_none() {
    let base = spawn(Router::new().route("/", get(opensecrets))).await;
    let client = OpenSecretsClient::with_base_url(Some("bad".to_string()), &base, &options());

    assert!(client.get_organization_summary("D1").await.is_none());
    assert!(client.get_candidate_funding("N1", "2024").await.is_none());
}

// =============================================================================
// DATA SOURCES
// =============================================================================

#[test]
fn configured_keys_enable_live_calls() {
    let config = SourcesConfig {
        littlesis_api_key: Some("a".to_string()),
        news_api_key: None,
        opensecrets_api_key: Some("c".to_string()),
        ..SourcesConfig::default()
    };
    let sources = DataSources::from_config(&config);

    assert!(sources.littlesis.is_api_available());
    assert!(!sources.news.is_api_available());
    assert!(sources.opensecrets.is_api_available());
}

#[tokio::test]
async fn collection_over_unreachable_sources_is_empty() {
    let sources = DataSources {
        littlesis: LittleSisClient::with_base_url(Some("k".to_string()), CLOSED, &options()),
        news: NewsClient::with_base_url(Some("k".to_string()), CLOSED, &options()),
        opensecrets: OpenSecretsClient::with_base_url(Some("k".to_string()), CLOSED, &options()),
    };

    let collected = collect_network(&sources, "anything").await;
    assert!(collected.articles.is_empty());
    assert!(collected.entities.is_empty());
    assert!(collected.relationships.is_empty());
}
