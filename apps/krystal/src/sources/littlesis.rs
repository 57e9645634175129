//! # LittleSis Client
//!
//! Entities and relationships from the LittleSis database of who-knows-who
//! among the powerful. Bearer authentication with `LITTLESIS_API_KEY`.

use super::{Auth, ClientOptions, HttpSource, degrade};
use krystal_core::{Entity, EntityId, EntityKind, Metadata, Relationship};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LITTLESIS_BASE_URL: &str = "https://api.littlesis.org";

/// Kind given to connection counterparts whose type is not known.
const UNKNOWN_KIND: &str = "unknown";

// =============================================================================
// RECORDS
// =============================================================================

/// An entity as LittleSis describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LittleSisEntity {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", alias = "primary_ext", default)]
    pub kind: String,
    #[serde(default, alias = "blurb")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl LittleSisEntity {
    /// Engine record; source-specific fields go to metadata.
    #[must_use]
    pub fn into_entity(self) -> Entity {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::from("littlesis"));
        if let Some(score) = self.influence_score {
            metadata.insert("influence_score".to_string(), Value::from(score));
        }
        if let Some(website) = self.website {
            metadata.insert("website".to_string(), Value::from(website));
        }

        Entity {
            id: Some(EntityId::from(self.id)),
            name: self.name,
            kind: entity_kind(self.kind),
            sector: self.sector,
            description: self.description,
            metadata,
        }
    }
}

/// LittleSis labels organizations `Org`.
fn entity_kind(kind: String) -> EntityKind {
    if kind.eq_ignore_ascii_case("org") {
        EntityKind::Organization
    } else {
        EntityKind::from(kind)
    }
}

/// A relationship between a LittleSis entity and another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: u64,
    pub entity1_id: u64,
    pub entity2_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity2_name: Option<String>,
    #[serde(default)]
    pub relationship_type: String,
    #[serde(default, alias = "description1")]
    pub description: Option<String>,
    #[serde(default)]
    pub strength: Option<f64>,
}

impl Connection {
    /// The side of the connection that is not `queried`.
    ///
    /// LittleSis lists a relationship under both of its entities, so the
    /// queried entity may sit on either side.
    #[must_use]
    pub fn counterpart_id(&self, queried: u64) -> u64 {
        if self.entity1_id == queried {
            self.entity2_id
        } else {
            self.entity1_id
        }
    }

    /// Relationship from `queried` to its counterpart.
    #[must_use]
    pub fn to_relationship(&self, queried: u64) -> Relationship {
        let mut metadata = Metadata::new();
        metadata.insert("littlesis_id".to_string(), Value::from(self.id));

        Relationship {
            source: EntityId::from(queried),
            target: EntityId::from(self.counterpart_id(queried)),
            kind: Some(self.relationship_type.clone()),
            strength: self.strength,
            description: self.description.clone(),
            metadata,
        }
    }

    /// The entity on the far side from `queried`, as far as the connection
    /// describes it. Only `entity2` carries a name.
    #[must_use]
    pub fn counterpart(&self, queried: u64) -> Entity {
        let id = self.counterpart_id(queried);
        let name = self
            .entity2_name
            .clone()
            .filter(|_| id == self.entity2_id)
            .unwrap_or_else(|| format!("Entity {}", id));
        Entity::new(id, name, EntityKind::from(UNKNOWN_KIND))
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// LittleSis API client.
#[derive(Debug, Clone)]
pub struct LittleSisClient {
    api_key: Option<String>,
    source: HttpSource,
}

impl LittleSisClient {
    #[must_use]
    pub fn new(api_key: Option<String>, options: &ClientOptions) -> Self {
        Self::with_base_url(api_key, LITTLESIS_BASE_URL, options)
    }

    #[must_use]
    pub fn with_base_url(api_key: Option<String>, base_url: &str, options: &ClientOptions) -> Self {
        let auth = Auth::Bearer(api_key.clone().unwrap_or_default());
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

    /// Entities matching `query`.
    pub async fn search_entities(&self, query: &str, page: u32, per_page: u32) -> Vec<Entity> {
        if !self.is_api_available() {
            return fixture_search(query);
        }

        let params = [
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        match self.source.get_json("/entities", &params).await {
            Ok(body) => parse_entities(&body),
            Err(e) => {
                degrade("littlesis", "search_entities", &e);
                Vec::new()
            }
        }
    }

    /// Connections of an entity, optionally only of the given types.
    pub async fn get_entity_connections(
        &self,
        entity_id: u64,
        relationship_types: &[String],
    ) -> Vec<Connection> {
        let connections = if self.is_api_available() {
            let path = format!("/entity/{}/relationships", entity_id);
            match self.source.get_json(&path, &[]).await {
                Ok(body) => parse_connections(&body),
                Err(e) => {
                    degrade("littlesis", "get_entity_connections", &e);
                    Vec::new()
                }
            }
        } else {
            fixture_connections(entity_id)
        };

        if relationship_types.is_empty() {
            return connections;
        }
        connections
            .into_iter()
            .filter(|c| relationship_types.contains(&c.relationship_type))
            .collect()
    }

    /// Full record of one entity.
    pub async fn get_entity_details(&self, entity_id: u64) -> Option<Entity> {
        if !self.is_api_available() {
            return Some(fixture_details(entity_id));
        }

        let path = format!("/entity/{}", entity_id);
        match self.source.get_json(&path, &[]).await {
            Ok(body) => {
                let data = body.get("data").unwrap_or(&body);
                decode::<LittleSisEntity>(data).map(LittleSisEntity::into_entity)
            }
            Err(e) => {
                degrade("littlesis", "get_entity_details", &e);
                None
            }
        }
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Flatten a JSON:API resource (`{id, attributes: {...}}`) into one object.
fn flatten_resource(item: &Value) -> Value {
    let Some(attributes) = item.get("attributes").and_then(Value::as_object) else {
        return item.clone();
    };
    let mut flat = attributes.clone();
    if let Some(id) = item.get("id") {
        let id = match id {
            Value::String(s) => s.parse::<u64>().map(Value::from).unwrap_or_else(|_| id.clone()),
            other => other.clone(),
        };
        flat.insert("id".to_string(), id);
    }
    Value::Object(flat)
}

/// Decode one resource, skipping it with a debug log when malformed.
fn decode<T: serde::de::DeserializeOwned>(item: &Value) -> Option<T> {
    serde_json::from_value(flatten_resource(item))
        .inspect_err(|e| tracing::debug!("Skipping malformed LittleSis record: {}", e))
        .ok()
}

fn data_items(body: &Value) -> &[Value] {
    body.get("data")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub(crate) fn parse_entities(body: &Value) -> Vec<Entity> {
    data_items(body)
        .iter()
        .filter_map(decode::<LittleSisEntity>)
        .map(LittleSisEntity::into_entity)
        .collect()
}

pub(crate) fn parse_connections(body: &Value) -> Vec<Connection> {
    data_items(body)
        .iter()
        .filter_map(|item| {
            let mut flat = flatten_resource(item);
            // live records carry a numeric category instead of a type name
            if let Some(obj) = flat.as_object_mut()
                && !obj.contains_key("relationship_type")
                && let Some(category) = obj.get("category_id").and_then(Value::as_u64)
            {
                obj.insert(
                    "relationship_type".to_string(),
                    Value::from(category_name(category)),
                );
            }
            decode::<Connection>(&flat)
        })
        .collect()
}

/// LittleSis relationship category names.
fn category_name(category: u64) -> &'static str {
    match category {
        1 => "position",
        2 => "education",
        3 => "membership",
        4 => "family",
        5 => "donation",
        6 => "transaction",
        7 => "lobbying",
        8 => "social",
        9 => "professional",
        10 => "ownership",
        11 => "hierarchy",
        _ => "generic",
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

fn fixture_entity(id: u64, name: String, kind: &str, description: String, score: f64) -> Entity {
    LittleSisEntity {
        id,
        name,
        kind: kind.to_string(),
        description: Some(description),
        sector: None,
        influence_score: Some(score),
        website: None,
    }
    .into_entity()
}

fn fixture_search(query: &str) -> Vec<Entity> {
    vec![
        fixture_entity(
            1,
            format!("{} Corporation", query),
            "Corporation",
            format!("Major corporation related to {}", query),
            85.0,
        ),
        fixture_entity(
            2,
            format!("{} Foundation", query),
            "Organization",
            format!("Non-profit organization related to {}", query),
            60.0,
        ),
        fixture_entity(
            3,
            format!("{} Government Official", query),
            "Person",
            format!("Government official involved with {}", query),
            75.0,
        ),
    ]
}

fn fixture_connections(entity_id: u64) -> Vec<Connection> {
    vec![
        Connection {
            id: 101,
            entity1_id: entity_id,
            entity2_id: entity_id.saturating_add(100),
            entity2_name: Some("Connected Corporation".to_string()),
            relationship_type: "board_member".to_string(),
            description: Some("Serves on board of directors".to_string()),
            strength: Some(0.8),
        },
        Connection {
            id: 102,
            entity1_id: entity_id,
            entity2_id: entity_id.saturating_add(200),
            entity2_name: Some("Political Committee".to_string()),
            relationship_type: "political_donations".to_string(),
            description: Some("Major political donor".to_string()),
            strength: Some(0.6),
        },
    ]
}

fn fixture_details(entity_id: u64) -> Entity {
    let mut entity = LittleSisEntity {
        id: entity_id,
        name: format!("Entity {}", entity_id),
        kind: "Corporation".to_string(),
        description: Some("A major corporate entity with significant influence".to_string()),
        sector: Some("Technology".to_string()),
        influence_score: Some(78.0),
        website: Some("https://example.com".to_string()),
    }
    .into_entity();
    entity
        .metadata
        .insert("founded_year".to_string(), Value::from(1990));
    entity
}

// =============================================================================
// TESTS
// =============================================================================
