//! # Core Type Definitions
//!
//! This module contains the data model of the power mapping engine:
//! - Identifiers (`EntityId`)
//! - Actors and their institutional weight (`Entity`, `EntityKind`)
//! - Ties between actors (`Relationship`)
//! - Error types (`KrystalError`)
//!
//! ## Ordering Guarantees
//!
//! `EntityId` implements `Ord`, so every collection keyed by it is a
//! `BTreeMap`/`BTreeSet` and every analysis output is reproducible.

use crate::primitives::DEFAULT_RELATIONSHIP_STRENGTH;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Free-form fields carried through from the source record.
pub type Metadata = BTreeMap<String, serde_json::Value>;

// =============================================================================
// ENTITY IDENTIFIER
// =============================================================================

/// Unique identifier for an entity in the influence network.
///
/// Upstream databases use numeric ids while hand-written records often use
/// slugs, so both `1` and `"1"` decode to the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive an identifier from a display name.
    ///
    /// Keeps alphanumerics, `_` and `-`, lower-cased. Falls back to
    /// `entity_{index}` when nothing survives.
    #[must_use]
    pub fn from_name(name: &str, index: usize) -> Self {
        let slug: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .flat_map(char::to_lowercase)
            .collect();
        if slug.is_empty() {
            Self(format!("entity_{}", index))
        } else {
            Self(slug)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntityIdVisitor;

        impl Visitor<'_> for EntityIdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an entity id (integer or string)")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntityId, E> {
                Ok(EntityId::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntityId, E> {
                Ok(EntityId(v.to_string()))
            }

            /// Integral floats such as `1.0` name the same entity as `1`.
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<EntityId, E> {
                if !v.is_finite() || v.fract() != 0.0 {
                    return Err(E::invalid_value(de::Unexpected::Float(v), &self));
                }
                if v >= 0.0 && v < u64::MAX as f64 {
                    Ok(EntityId::from(v as u64))
                } else if v >= i64::MIN as f64 && v < 0.0 {
                    Ok(EntityId((v as i64).to_string()))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityId, E> {
                if v.is_empty() {
                    return Err(E::custom("entity id must not be empty"));
                }
                Ok(EntityId::from(v))
            }
        }

        deserializer.deserialize_any(EntityIdVisitor)
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// The institutional category of an entity.
///
/// Parsed case-insensitively; anything unrecognised is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Corporation,
    Government,
    Person,
    Organization,
    Other(String),
}

impl Default for EntityKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl EntityKind {
    /// Canonical lower-case label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Corporation => "corporation",
            Self::Government => "government",
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Other(s) => s,
        }
    }

    /// Default institutional authority weight of this kind.
    #[must_use]
    pub fn default_multiplier(&self) -> f64 {
        match self {
            Self::Corporation => 1.2,
            Self::Government => 1.3,
            Self::Person => 1.1,
            Self::Organization | Self::Other(_) => 1.0,
        }
    }
}

impl From<String> for EntityKind {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "corporation" => Self::Corporation,
            "government" => Self::Government,
            "person" => Self::Person,
            "organization" => Self::Organization,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for EntityKind {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// A corporation, government body, official or other actor.
///
/// `id` is optional on input; the `Ingestor` derives one from the name
/// before the entity enters the graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other fields of the source record.
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Entity {
    /// Create an entity with an explicit id.
    #[must_use]
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// Builder-style sector assignment.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Name to show in findings, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        match &self.id {
            Some(id) => format!("Entity {}", id),
            None => "Entity".to_string(),
        }
    }
}

// =============================================================================
// RELATIONSHIP
// =============================================================================

/// An undirected tie between two entities (board seat, donation, lobbying...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Relationship {
    /// Create a typed relationship with an explicit strength.
    #[must_use]
    pub fn new(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        kind: impl Into<String>,
        strength: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: Some(kind.into()),
            strength: Some(strength),
            description: None,
            metadata: Metadata::new(),
        }
    }

    /// Strength of the tie, defaulting when the record carries none.
    #[must_use]
    pub fn strength(&self) -> f64 {
        self.strength.unwrap_or(DEFAULT_RELATIONSHIP_STRENGTH)
    }

    /// Whether this relationship has the given type.
    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Krystal engine.
///
/// The core never panics; every failure is a variant here.
#[derive(Debug, Error)]
pub enum KrystalError {
    /// An entity record cannot be accepted.
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// A relationship record cannot be accepted.
    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    /// The requested entity is not part of the network.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The requested export or input format is not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// An input exceeded a hard limit.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
