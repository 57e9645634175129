//! # News Client
//!
//! News search and trending topics from a NewsAPI-compatible service
//! (`X-Api-Key` header), plus keyword entity extraction over article text.

use super::{Auth, ClientOptions, HttpSource, degrade};
use krystal_core::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NEWS_BASE_URL: &str = "https://newsapi.org/v2";

// =============================================================================
// RECORDS
// =============================================================================

/// A news article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub content: String,
    /// Entity names mentioned by the article.
    #[serde(default)]
    pub entities: Vec<String>,
}

impl Article {
    /// Placeholder article titled with the query, for when nothing was found.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: String::new(),
            source: String::new(),
            published_at: String::new(),
            content: String::new(),
            entities: Vec::new(),
        }
    }
}

/// A currently trending news topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

/// An entity recognised in free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub confidence: f64,
}

// =============================================================================
// ENTITY EXTRACTION
// =============================================================================

const TECHNOLOGY_KEYWORDS: [&str; 4] = ["apple", "google", "microsoft", "amazon"];
const GOVERNMENT_KEYWORDS: [&str; 3] = ["senate", "congress", "white house"];

/// Recognise entity categories in `text` by keyword.
///
/// At most one technology corporation and one government entity are
/// reported, in that order.
#[must_use]
pub fn extract_entities(text: &str) -> Vec<ExtractedEntity> {
    let lower = text.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    let mut entities = Vec::new();
    if mentions(&TECHNOLOGY_KEYWORDS[..]) {
        entities.push(ExtractedEntity {
            name: "Technology Corporation".to_string(),
            kind: EntityKind::Corporation,
            confidence: 0.85,
        });
    }
    if mentions(&GOVERNMENT_KEYWORDS[..]) {
        entities.push(ExtractedEntity {
            name: "Government Entity".to_string(),
            kind: EntityKind::Government,
            confidence: 0.75,
        });
    }
    entities
}

// =============================================================================
// CLIENT
// =============================================================================

/// News API client.
#[derive(Debug, Clone)]
pub struct NewsClient {
    api_key: Option<String>,
    source: HttpSource,
}

impl NewsClient {
    #[must_use]
    pub fn new(api_key: Option<String>, options: &ClientOptions) -> Self {
        Self::with_base_url(api_key, NEWS_BASE_URL, options)
    }

    #[must_use]
    pub fn with_base_url(api_key: Option<String>, base_url: &str, options: &ClientOptions) -> Self {
        let auth = Auth::Header("X-Api-Key", api_key.clone().unwrap_or_default());
        Self {
            api_key,
            source: HttpSource::new(base_url, auth, options),
        }
    }

    /// Whether calls go to the live service.
    #[must_use]
    pub fn is_api_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Articles about `query`, most relevant first.
    pub async fn search_news(&self, query: &str, max_results: usize, language: &str) -> Vec<Article> {
        let mut articles = if self.is_api_available() {
            let params = [
                ("q", query.to_string()),
                ("pageSize", max_results.to_string()),
                ("language", language.to_string()),
                ("sortBy", "relevancy".to_string()),
            ];
            match self.source.get_json("/everything", &params).await {
                Ok(body) => parse_articles(&body),
                Err(e) => {
                    degrade("news", "search_news", &e);
                    Vec::new()
                }
            }
        } else {
            fixture_articles(query)
        };
        articles.truncate(max_results);
        articles
    }

    /// Trending topics of a news category.
    pub async fn get_trending_topics(&self, category: &str) -> Vec<TrendingTopic> {
        if !self.is_api_available() {
            return fixture_topics();
        }

        let params = [
            ("category", category.to_string()),
            ("country", "us".to_string()),
        ];
        match self.source.get_json("/top-headlines", &params).await {
            Ok(body) => parse_articles(&body)
                .into_iter()
                .map(|article| TrendingTopic {
                    title: article.title,
                    volume: None,
                    sentiment: None,
                })
                .collect(),
            Err(e) => {
                degrade("news", "get_trending_topics", &e);
                Vec::new()
            }
        }
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Articles of a NewsAPI response. Mentioned entities are extracted from
/// title and content.
pub(crate) fn parse_articles(body: &Value) -> Vec<Article> {
    let Some(items) = body.get("articles").and_then(Value::as_array) else {
        return Vec::new();
    };
    let text = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    items
        .iter()
        .filter_map(|item| {
            let title = text(item, "title");
            if title.is_empty() {
                return None;
            }
            let content = match text(item, "content") {
                c if c.is_empty() => text(item, "description"),
                c => c,
            };
            let source = item
                .get("source")
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let entities = extract_entities(&format!("{} {}", title, content))
                .into_iter()
                .map(|e| e.name)
                .collect();

            Some(Article {
                url: text(item, "url"),
                published_at: text(item, "publishedAt"),
                title,
                source,
                content,
                entities,
            })
        })
        .collect()
}

// =============================================================================
// FIXTURES
// =============================================================================

fn fixture_articles(query: &str) -> Vec<Article> {
    vec![
        Article {
            title: format!("Breaking News: Major Developments in {}", query),
            url: "https://example.com/news/1".to_string(),
            source: "Example News".to_string(),
            published_at: "2024-01-15T10:00:00Z".to_string(),
            content: format!(
                "This is a sample article about {} and its impact on various sectors.",
                query
            ),
            entities: vec![
                format!("{} Corporation", query),
                "Government Official".to_string(),
            ],
        },
        Article {
            title: format!("Analysis: The Future of {} Industry", query),
            url: "https://example.com/news/2".to_string(),
            source: "Business Daily".to_string(),
            published_at: "2024-01-14T15:30:00Z".to_string(),
            content: format!(
                "Deep analysis of how {} is transforming the business landscape.",
                query
            ),
            entities: vec![
                format!("{} Foundation", query),
                "Industry Leaders".to_string(),
            ],
        },
    ]
}

fn fixture_topics() -> Vec<TrendingTopic> {
    [
        ("Technology Sector Regulations", 85, "mixed"),
        ("Corporate Mergers and Acquisitions", 72, "positive"),
        ("Political Campaign Financing", 68, "negative"),
    ]
    .into_iter()
    .map(|(title, volume, sentiment)| TrendingTopic {
        title: title.to_string(),
        volume: Some(volume),
        sentiment: Some(sentiment.to_string()),
    })
    .collect()
}

// =============================================================================
// TESTS
// =============================================================================
