//! # redb-backed Network Store
//!
//! Entities are keyed by id, relationships by an insertion sequence number,
//! so a reload returns entities in id order and relationships in the order
//! they were added. Values are postcard-encoded canonical records.

use crate::export::{CanonicalEntity, CanonicalRelationship};
use crate::storage::NetworkSnapshot;
use crate::{Entity, KrystalError, Relationship};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Entities: id -> postcard `CanonicalEntity`
const ENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entities");

/// Relationships: sequence number -> postcard `CanonicalRelationship`
const RELATIONSHIPS: TableDefinition<u64, &[u8]> = TableDefinition::new("relationships");

/// Metadata: key -> value
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_SEQ: &str = "next_relationship_seq";

fn io_err(e: impl std::fmt::Display) -> KrystalError {
    KrystalError::IoError(e.to_string())
}

/// A disk-backed store for the records of one network.
pub struct NetworkStore {
    db: Database,
    next_seq: u64,
}

impl std::fmt::Debug for NetworkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkStore")
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

impl NetworkStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KrystalError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(ENTITIES).map_err(io_err)?;
            let _ = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let next_seq = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get(NEXT_SEQ)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        Ok(Self { db, next_seq })
    }

    /// Number of stored entities.
    pub fn entity_count(&self) -> Result<u64, KrystalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ENTITIES).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    /// Number of stored relationships.
    pub fn relationship_count(&self) -> Result<u64, KrystalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
        table.len().map_err(io_err)
    }

    /// Read every stored record.
    pub fn load_snapshot(&self) -> Result<NetworkSnapshot, KrystalError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;

        let mut entities = Vec::new();
        {
            let table = read_txn.open_table(ENTITIES).map_err(io_err)?;
            for entry in table.iter().map_err(io_err)? {
                let (_, value) = entry.map_err(io_err)?;
                let canonical: CanonicalEntity = postcard::from_bytes(value.value())
                    .map_err(|e| KrystalError::DeserializationError(e.to_string()))?;
                entities.push(canonical.into_entity()?);
            }
        }

        let mut relationships = Vec::new();
        {
            let table = read_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            for entry in table.iter().map_err(io_err)? {
                let (_, value) = entry.map_err(io_err)?;
                let canonical: CanonicalRelationship = postcard::from_bytes(value.value())
                    .map_err(|e| KrystalError::DeserializationError(e.to_string()))?;
                relationships.push(canonical.into_relationship()?);
            }
        }

        Ok(NetworkSnapshot {
            entities,
            relationships,
        })
    }

    /// Replace everything with `snapshot` in one transaction.
    pub fn replace_snapshot(&mut self, snapshot: &NetworkSnapshot) -> Result<(), KrystalError> {
        let entities = encode_entities(&snapshot.entities)?;
        let relationships = encode_relationships(&snapshot.relationships)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        write_txn.delete_table(ENTITIES).map_err(io_err)?;
        write_txn.delete_table(RELATIONSHIPS).map_err(io_err)?;
        let next_seq = relationships.len() as u64;
        {
            let mut entity_table = write_txn.open_table(ENTITIES).map_err(io_err)?;
            for (id, bytes) in &entities {
                entity_table
                    .insert(id.as_str(), bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut rel_table = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            for (seq, bytes) in relationships.iter().enumerate() {
                rel_table
                    .insert(seq as u64, bytes.as_slice())
                    .map_err(io_err)?;
            }

            let mut meta_table = write_txn.open_table(METADATA).map_err(io_err)?;
            meta_table.insert(NEXT_SEQ, next_seq).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.next_seq = next_seq;
        tracing::debug!(
            entities = entities.len(),
            relationships = relationships.len(),
            "Network snapshot stored"
        );
        Ok(())
    }

    /// Insert entities, replacing stored ones with the same id.
    ///
    /// The batch is validated before the transaction opens: one entity
    /// without an id rejects all of them.
    pub fn upsert_entities(&mut self, entities: &[Entity]) -> Result<usize, KrystalError> {
        let encoded = encode_entities(entities)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(ENTITIES).map_err(io_err)?;
            for (id, bytes) in &encoded {
                table.insert(id.as_str(), bytes.as_slice()).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(encoded.len())
    }

    /// Append relationships after the stored ones.
    pub fn append_relationships(
        &mut self,
        relationships: &[Relationship],
    ) -> Result<usize, KrystalError> {
        let encoded = encode_relationships(relationships)?;
        let mut seq = self.next_seq;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(RELATIONSHIPS).map_err(io_err)?;
            for bytes in &encoded {
                table.insert(seq, bytes.as_slice()).map_err(io_err)?;
                seq = seq.saturating_add(1);
            }
            let mut meta_table = write_txn.open_table(METADATA).map_err(io_err)?;
            meta_table.insert(NEXT_SEQ, seq).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.next_seq = seq;
        Ok(encoded.len())
    }

    /// Remove every record.
    pub fn clear(&mut self) -> Result<(), KrystalError> {
        self.replace_snapshot(&NetworkSnapshot::default())
    }

    /// Compact the database file. Returns whether any space was reclaimed.
    pub fn compact(&mut self) -> Result<bool, KrystalError> {
        self.db.compact().map_err(io_err)
    }
}

fn encode_entities(entities: &[Entity]) -> Result<Vec<(String, Vec<u8>)>, KrystalError> {
    entities
        .iter()
        .map(|entity| {
            let canonical = CanonicalEntity::from_entity(entity)?;
            let bytes = postcard::to_allocvec(&canonical)
                .map_err(|e| KrystalError::SerializationError(e.to_string()))?;
            Ok((canonical.id, bytes))
        })
        .collect()
}

fn encode_relationships(relationships: &[Relationship]) -> Result<Vec<Vec<u8>>, KrystalError> {
    relationships
        .iter()
        .map(|rel| {
            let canonical = CanonicalRelationship::from_relationship(rel)?;
            postcard::to_allocvec(&canonical)
                .map_err(|e| KrystalError::SerializationError(e.to_string()))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
