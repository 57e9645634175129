//! # Export Module
//!
//! Two serialized forms of a network:
//!
//! - **JSON export** (`NetworkExport`): the interchange document, also the
//!   input format of `load`.
//! - **Canonical export**: a sorted, bit-exact `postcard` stream behind a
//!   `KRYX` header with a checksum. Same network in, same bytes out.
//!
//! The core has no clock; callers pass the export timestamp.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES};
use crate::storage::NetworkSnapshot;
use crate::{Entity, EntityId, EntityKind, KrystalError, Metadata, Relationship};
use serde::{Deserialize, Serialize};

// =============================================================================
// JSON EXPORT
// =============================================================================

/// Counts and timestamp attached to a JSON export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub total_entities: usize,
    pub total_relationships: usize,
    pub analysis_timestamp: String,
}

/// The JSON interchange document.
///
/// `metadata` is optional on input so a bare
/// `{"entities": [...], "relationships": [...]}` file loads too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkExport {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub metadata: ExportMetadata,
}

impl NetworkExport {
    #[must_use]
    pub fn new(
        entities: Vec<Entity>,
        relationships: Vec<Relationship>,
        exported_at: impl Into<String>,
    ) -> Self {
        let metadata = ExportMetadata {
            total_entities: entities.len(),
            total_relationships: relationships.len(),
            analysis_timestamp: exported_at.into(),
        };
        Self {
            entities,
            relationships,
            metadata,
        }
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, KrystalError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| KrystalError::SerializationError(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, KrystalError> {
        serde_json::from_str(json).map_err(|e| KrystalError::DeserializationError(e.to_string()))
    }

    /// Drop the metadata and keep the records.
    #[must_use]
    pub fn into_snapshot(self) -> NetworkSnapshot {
        NetworkSnapshot {
            entities: self.entities,
            relationships: self.relationships,
        }
    }
}

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Maximum entity count accepted from a canonical import.
pub const MAX_IMPORT_ENTITY_COUNT: u64 = 1_000_000;

/// Maximum relationship count accepted from a canonical import.
pub const MAX_IMPORT_RELATIONSHIP_COUNT: u64 = 10_000_000;

/// Header of a canonical export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub entity_count: u64,
    pub relationship_count: u64,
    /// Checksum of the data section.
    pub checksum: u64,
}

impl CanonicalHeader {
    #[must_use]
    pub fn new(entity_count: u64, relationship_count: u64, checksum: u64) -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
            entity_count,
            relationship_count,
            checksum,
        }
    }

    /// Check magic and version.
    ///
    /// Messages stay generic so they reveal nothing about the format.
    pub fn validate(&self) -> Result<(), KrystalError> {
        if &self.magic != MAGIC_BYTES {
            return Err(KrystalError::DeserializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(KrystalError::DeserializationError(
                "Unsupported file version".to_string(),
            ));
        }
        Ok(())
    }
}

/// An entity in canonical form. Extra fields are kept as a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalEntity {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub metadata: String,
}

impl CanonicalEntity {
    pub(crate) fn from_entity(entity: &Entity) -> Result<Self, KrystalError> {
        let id = entity.id.as_ref().ok_or_else(|| {
            KrystalError::InvalidEntity(format!("entity '{}' has no id", entity.name))
        })?;
        Ok(Self {
            id: id.as_str().to_string(),
            name: entity.name.clone(),
            kind: String::from(entity.kind.clone()),
            sector: entity.sector.clone(),
            description: entity.description.clone(),
            metadata: encode_metadata(&entity.metadata)?,
        })
    }

    pub(crate) fn into_entity(self) -> Result<Entity, KrystalError> {
        Ok(Entity {
            id: Some(EntityId::new(self.id)),
            name: self.name,
            kind: EntityKind::from(self.kind),
            sector: self.sector,
            description: self.description,
            metadata: decode_metadata(&self.metadata)?,
        })
    }
}

/// A relationship in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalRelationship {
    pub source: String,
    pub target: String,
    pub kind: Option<String>,
    pub strength: Option<f64>,
    pub description: Option<String>,
    pub metadata: String,
}

impl CanonicalRelationship {
    pub(crate) fn from_relationship(rel: &Relationship) -> Result<Self, KrystalError> {
        Ok(Self {
            source: rel.source.as_str().to_string(),
            target: rel.target.as_str().to_string(),
            kind: rel.kind.clone(),
            strength: rel.strength,
            description: rel.description.clone(),
            metadata: encode_metadata(&rel.metadata)?,
        })
    }

    pub(crate) fn into_relationship(self) -> Result<Relationship, KrystalError> {
        Ok(Relationship {
            source: EntityId::new(self.source),
            target: EntityId::new(self.target),
            kind: self.kind,
            strength: self.strength,
            description: self.description,
            metadata: decode_metadata(&self.metadata)?,
        })
    }
}

fn encode_metadata(metadata: &Metadata) -> Result<String, KrystalError> {
    if metadata.is_empty() {
        return Ok(String::new());
    }
    serde_json::to_string(metadata).map_err(|e| KrystalError::SerializationError(e.to_string()))
}

fn decode_metadata(raw: &str) -> Result<Metadata, KrystalError> {
    if raw.is_empty() {
        return Ok(Metadata::new());
    }
    serde_json::from_str(raw).map_err(|e| KrystalError::DeserializationError(e.to_string()))
}

/// A network in canonical form: entities sorted by id, relationships in
/// input order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalNetwork {
    pub entities: Vec<CanonicalEntity>,
    pub relationships: Vec<CanonicalRelationship>,
}

impl CanonicalNetwork {
    /// Build from records. Later entities replace earlier ones with the
    /// same id.
    pub fn from_snapshot(snapshot: &NetworkSnapshot) -> Result<Self, KrystalError> {
        let mut by_id = std::collections::BTreeMap::new();
        for entity in &snapshot.entities {
            let canonical = CanonicalEntity::from_entity(entity)?;
            by_id.insert(canonical.id.clone(), canonical);
        }
        let relationships = snapshot
            .relationships
            .iter()
            .map(CanonicalRelationship::from_relationship)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            entities: by_id.into_values().collect(),
            relationships,
        })
    }

    /// Convert back to records.
    pub fn into_snapshot(self) -> Result<NetworkSnapshot, KrystalError> {
        let entities = self
            .entities
            .into_iter()
            .map(CanonicalEntity::into_entity)
            .collect::<Result<Vec<_>, _>>()?;
        let relationships = self
            .relationships
            .into_iter()
            .map(CanonicalRelationship::into_relationship)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NetworkSnapshot {
            entities,
            relationships,
        })
    }
}

/// FNV-1a over the postcard data section.
///
/// Detects accidental corruption only; this is not a cryptographic hash.
fn checksum_bytes(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    data.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

fn encode_network(canonical: &CanonicalNetwork) -> Result<Vec<u8>, KrystalError> {
    postcard::to_allocvec(canonical)
        .map_err(|e| KrystalError::SerializationError(format!("Data: {}", e)))
}

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Export a network to canonical bytes.
///
/// Format:
/// ```text
/// [header_len: u32 LE] [CanonicalHeader (postcard)] [CanonicalNetwork (postcard)]
/// ```
pub fn export_canonical(snapshot: &NetworkSnapshot) -> Result<Vec<u8>, KrystalError> {
    let canonical = CanonicalNetwork::from_snapshot(snapshot)?;
    let data_bytes = encode_network(&canonical)?;

    let header = CanonicalHeader::new(
        canonical.entities.len() as u64,
        canonical.relationships.len() as u64,
        checksum_bytes(&data_bytes),
    );
    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| KrystalError::SerializationError(format!("Header: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Import a network from canonical bytes.
///
/// Rejects bad magic, unknown versions, oversized counts (checked before the
/// data section is decoded), checksum mismatches and count mismatches.
pub fn import_canonical(data: &[u8]) -> Result<NetworkSnapshot, KrystalError> {
    let Some(len_bytes) = data.get(..4) else {
        return Err(KrystalError::DeserializationError(
            "Data too short".to_string(),
        ));
    };
    let header_len =
        u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;

    let Some(header_bytes) = data.get(4..4 + header_len) else {
        return Err(KrystalError::DeserializationError(
            "Data too short for header".to_string(),
        ));
    };
    let header: CanonicalHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| KrystalError::DeserializationError(format!("Header: {}", e)))?;
    header.validate()?;

    if header.entity_count > MAX_IMPORT_ENTITY_COUNT {
        return Err(KrystalError::LimitExceeded(format!(
            "Entity count {} exceeds maximum allowed {}",
            header.entity_count, MAX_IMPORT_ENTITY_COUNT
        )));
    }
    if header.relationship_count > MAX_IMPORT_RELATIONSHIP_COUNT {
        return Err(KrystalError::LimitExceeded(format!(
            "Relationship count {} exceeds maximum allowed {}",
            header.relationship_count, MAX_IMPORT_RELATIONSHIP_COUNT
        )));
    }

    let data_bytes = &data[4 + header_len..];
    let computed = checksum_bytes(data_bytes);
    if computed != header.checksum {
        return Err(KrystalError::DeserializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }

    let canonical: CanonicalNetwork = postcard::from_bytes(data_bytes)
        .map_err(|e| KrystalError::DeserializationError(format!("Data: {}", e)))?;

    if canonical.entities.len() as u64 != header.entity_count {
        return Err(KrystalError::DeserializationError(
            "Entity count mismatch".to_string(),
        ));
    }
    if canonical.relationships.len() as u64 != header.relationship_count {
        return Err(KrystalError::DeserializationError(
            "Relationship count mismatch".to_string(),
        ));
    }

    canonical.into_snapshot()
}

/// Whether canonical bytes describe the same network as `snapshot`.
pub fn verify_canonical(snapshot: &NetworkSnapshot, data: &[u8]) -> Result<bool, KrystalError> {
    let imported = import_canonical(data)?;
    Ok(CanonicalNetwork::from_snapshot(snapshot)? == CanonicalNetwork::from_snapshot(&imported)?)
}

/// Checksum of the canonical data section of a network.
pub fn canonical_checksum(snapshot: &NetworkSnapshot) -> Result<u64, KrystalError> {
    let canonical = CanonicalNetwork::from_snapshot(snapshot)?;
    Ok(checksum_bytes(&encode_network(&canonical)?))
}

// =============================================================================
// CRYPTOGRAPHIC HASH
// =============================================================================

/// BLAKE3 hash of the canonical export, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
pub fn canonical_crypto_hash(snapshot: &NetworkSnapshot) -> Result<String, KrystalError> {
    let data = export_canonical(snapshot)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

/// Compare a network against an expected BLAKE3 hash.
#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(
    snapshot: &NetworkSnapshot,
    expected_hash: &str,
) -> Result<bool, KrystalError> {
    Ok(canonical_crypto_hash(snapshot)? == expected_hash)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{sample_entities, sample_relationships};

    fn sample() -> NetworkSnapshot {
        let mut entities = sample_entities();
        entities[0]
            .metadata
            .insert("founded".to_string(), serde_json::json!(1998));
        NetworkSnapshot {
            entities,
            relationships: sample_relationships(),
        }
    }

    #[test]
    fn canonical_roundtrip_keeps_records() {
        let snapshot = sample();
        let bytes = export_canonical(&snapshot).expect("export");
        let imported = import_canonical(&bytes).expect("import");

        assert_eq!(imported.entities, snapshot.entities);
        assert_eq!(imported.relationships, snapshot.relationships);
    }

    #[test]
    fn canonical_export_deterministic() {
        let snapshot = sample();
        let a = export_canonical(&snapshot).expect("export");
        let b = export_canonical(&snapshot).expect("export");
        assert_eq!(a, b);
        assert_eq!(
            canonical_checksum(&snapshot).expect("checksum"),
            canonical_checksum(&snapshot).expect("checksum")
        );
    }

    #[test]
    fn entity_order_does_not_change_bytes() {
        let snapshot = sample();
        let mut reversed = snapshot.clone();
        reversed.entities.reverse();
        assert_eq!(
            export_canonical(&snapshot).expect("export"),
            export_canonical(&reversed).expect("export")
        );
    }

    #[test]
    fn corrupted_data_rejected() {
        let mut bytes = export_canonical(&sample()).expect("export");
        if let Some(last) = bytes.last_mut() {
            *last ^= 0xFF;
        }
        assert!(import_canonical(&bytes).is_err());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = export_canonical(&sample()).expect("export");
        // first header byte after the length prefix is the magic
        bytes[4] = b'X';
        assert!(import_canonical(&bytes).is_err());
    }

    #[test]
    fn short_input_rejected() {
        assert!(import_canonical(&[]).is_err());
        assert!(import_canonical(&[200, 0, 0, 0, 1]).is_err());
    }

    #[test]
    fn verify_detects_difference() {
        let snapshot = sample();
        let bytes = export_canonical(&snapshot).expect("export");
        assert!(verify_canonical(&snapshot, &bytes).expect("verify"));

        let mut other = snapshot.clone();
        other.relationships.pop();
        assert!(!verify_canonical(&other, &bytes).expect("verify"));
    }

    #[test]
    fn entity_without_id_cannot_be_exported() {
        let snapshot = NetworkSnapshot {
            entities: vec![Entity::default()],
            relationships: Vec::new(),
        };
        assert!(matches!(
            export_canonical(&snapshot),
            Err(KrystalError::InvalidEntity(_))
        ));
    }

    #[test]
    fn json_export_counts() {
        let export = NetworkExport::new(
            sample_entities(),
            sample_relationships(),
            "2026-03-01T12:00:00",
        );
        assert_eq!(export.metadata.total_entities, 5);
        assert_eq!(export.metadata.total_relationships, 5);

        let json = export.to_json_pretty().expect("json");
        let back = NetworkExport::from_json(&json).expect("parse");
        assert_eq!(back.entities.len(), 5);
        assert_eq!(back.metadata.analysis_timestamp, "2026-03-01T12:00:00");
    }

    #[test]
    fn bare_document_loads() {
        let json = r#"{"entities": [{"id": 1, "name": "A"}], "relationships": []}"#;
        let doc = NetworkExport::from_json(json).expect("parse");
        assert_eq!(doc.entities.len(), 1);
        assert_eq!(doc.metadata, ExportMetadata::default());
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn crypto_hash_is_stable_hex() {
        let snapshot = sample();
        let hash = canonical_crypto_hash(&snapshot).expect("hash");
        assert_eq!(hash.len(), 64);
        assert!(verify_crypto_hash(&snapshot, &hash).expect("verify"));
    }
}
