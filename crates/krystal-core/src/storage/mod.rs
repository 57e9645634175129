//! # Storage Module
//!
//! Persistence of the current network between invocations.
//!
//! - `NetworkStore`: redb database with ACID transactions (default)
//! - `NetworkBackend::File`: a single canonical export file
//!
//! Both hold the records of a network (`NetworkSnapshot`), never derived
//! analysis: analysis is recomputed from the records on load.

mod redb_store;

pub use redb_store::NetworkStore;

use crate::export::{export_canonical, import_canonical};
use crate::{Entity, KrystalError, Relationship};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The records that make up a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl NetworkSnapshot {
    #[must_use]
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        Self {
            entities,
            relationships,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Where a network is persisted.
#[derive(Debug)]
pub enum NetworkBackend {
    /// redb database.
    Redb(NetworkStore),
    /// Canonical export file, rewritten on every save.
    File(PathBuf),
}

impl NetworkBackend {
    /// Open (or create) a redb backend.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, KrystalError> {
        Ok(Self::Redb(NetworkStore::open(path)?))
    }

    /// Use a canonical file backend. The file is created on first save.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Short name for logs and status output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Redb(_) => "redb",
            Self::File(_) => "file",
        }
    }

    /// Load the persisted network; empty when nothing was saved yet.
    pub fn load(&self) -> Result<NetworkSnapshot, KrystalError> {
        match self {
            Self::Redb(store) => store.load_snapshot(),
            Self::File(path) => {
                if !path.exists() {
                    return Ok(NetworkSnapshot::default());
                }
                let bytes = std::fs::read(path).map_err(|e| KrystalError::IoError(e.to_string()))?;
                import_canonical(&bytes)
            }
        }
    }

    /// Replace the persisted network.
    pub fn save(&mut self, snapshot: &NetworkSnapshot) -> Result<(), KrystalError> {
        match self {
            Self::Redb(store) => store.replace_snapshot(snapshot),
            Self::File(path) => {
                let bytes = export_canonical(snapshot)?;
                std::fs::write(path, bytes).map_err(|e| KrystalError::IoError(e.to_string()))
            }
        }
    }

    /// Add `batch` to the persisted network.
    ///
    /// Entities replace stored ones with the same id; relationships are
    /// appended after the stored ones. Every entity must carry an id.
    pub fn append(&mut self, batch: &NetworkSnapshot) -> Result<(), KrystalError> {
        match self {
            Self::Redb(store) => {
                store.upsert_entities(&batch.entities)?;
                store.append_relationships(&batch.relationships)?;
                Ok(())
            }
            Self::File(_) => {
                let mut merged = self.load()?;
                for entity in &batch.entities {
                    if entity.id.is_none() {
                        return Err(KrystalError::InvalidEntity(format!(
                            "'{}' has no id",
                            entity.display_name()
                        )));
                    }
                    match merged.entities.iter_mut().find(|e| e.id == entity.id) {
                        Some(existing) => *existing = entity.clone(),
                        None => merged.entities.push(entity.clone()),
                    }
                }
                merged
                    .relationships
                    .extend(batch.relationships.iter().cloned());
                self.save(&merged)
            }
        }
    }

    /// Stored entity and relationship record counts.
    pub fn counts(&self) -> Result<(u64, u64), KrystalError> {
        match self {
            Self::Redb(store) => Ok((store.entity_count()?, store.relationship_count()?)),
            Self::File(_) => {
                let snapshot = self.load()?;
                Ok((
                    snapshot.entities.len() as u64,
                    snapshot.relationships.len() as u64,
                ))
            }
        }
    }

    /// Reclaim unused space. Returns `false` when the backend has nothing to
    /// compact.
    pub fn compact(&mut self) -> Result<bool, KrystalError> {
        match self {
            Self::Redb(store) => store.compact(),
            Self::File(_) => Ok(false),
        }
    }

    /// Remove the persisted network.
    pub fn clear(&mut self) -> Result<(), KrystalError> {
        match self {
            Self::Redb(store) => store.clear(),
            Self::File(path) => {
                if path.exists() {
                    std::fs::remove_file(path).map_err(|e| KrystalError::IoError(e.to_string()))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;
    use crate::mapper::{sample_entities, sample_relationships};
    use tempfile::tempdir;

    fn sample() -> NetworkSnapshot {
        NetworkSnapshot::new(sample_entities(), sample_relationships())
    }

    #[test]
    fn file_backend_roundtrip() {
        let temp = tempdir().expect("temp dir");
        let mut backend = NetworkBackend::file(temp.path().join("network.kryx"));

        assert!(backend.load().expect("load empty").is_empty());
        backend.save(&sample()).expect("save");
        assert_eq!(backend.load().expect("load"), sample());

        backend.clear().expect("clear");
        assert!(backend.load().expect("load cleared").is_empty());
    }

    #[test]
    fn redb_backend_roundtrip() {
        let temp = tempdir().expect("temp dir");
        let mut backend = NetworkBackend::redb(temp.path().join("network.redb")).expect("open");
        assert_eq!(backend.name(), "redb");

        backend.save(&sample()).expect("save");
        assert_eq!(backend.load().expect("load"), sample());
        assert_eq!(backend.counts().expect("counts"), (5, 5));
        backend.compact().expect("compact");
    }

    fn extra_batch() -> NetworkSnapshot {
        NetworkSnapshot::new(
            vec![
                Entity::new(1, "Renamed Corp", EntityKind::Corporation),
                Entity::new(6, "New Fund", EntityKind::Organization),
            ],
            vec![Relationship::new(6, 1, "funding", 0.6)],
        )
    }

    fn assert_appended(backend: &NetworkBackend) {
        let stored = backend.load().expect("load");
        assert_eq!(stored.entities.len(), 6);
        assert_eq!(stored.relationships.len(), 6);
        assert_eq!(backend.counts().expect("counts"), (6, 6));

        let renamed = stored
            .entities
            .iter()
            .find(|e| e.id == Some(crate::EntityId::from(1_u64)))
            .expect("entity 1");
        assert_eq!(renamed.name, "Renamed Corp");
        assert!(stored.relationships[5].is_kind("funding"));
    }

    #[test]
    fn redb_append_upserts_and_appends() {
        let temp = tempdir().expect("temp dir");
        let mut backend = NetworkBackend::redb(temp.path().join("network.redb")).expect("open");
        backend.save(&sample()).expect("save");

        backend.append(&extra_batch()).expect("append");
        assert_appended(&backend);
    }

    #[test]
    fn file_append_upserts_and_appends() {
        let temp = tempdir().expect("temp dir");
        let mut backend = NetworkBackend::file(temp.path().join("network.kryx"));
        backend.save(&sample()).expect("save");

        backend.append(&extra_batch()).expect("append");
        assert_appended(&backend);
        assert!(!backend.compact().expect("compact"));
    }

    #[test]
    fn file_append_rejects_entity_without_id() {
        let temp = tempdir().expect("temp dir");
        let mut backend = NetworkBackend::file(temp.path().join("network.kryx"));
        backend.save(&sample()).expect("save");

        let batch = NetworkSnapshot::new(vec![Entity::default()], Vec::new());
        assert!(backend.append(&batch).is_err());
        assert_eq!(backend.load().expect("load"), sample());
    }
}
