//! Corpus change tracking.
//!
//! The registry remembers, per source document, the content hash that was last
//! embedded and when. A document needs (re-)embedding exactly when it has no entry
//! or its current hash differs from the stored one.
//!
//! Persisted as JSON:
//!
//! ```json
//! {
//!   "indexed_files": {
//!     "doc1.pdf": { "hash": "9f86d0…", "indexed_at": "2024-05-01T12:00:00Z" }
//!   }
//! }
//! ```
//!
//! Hashes are 256-bit BLAKE3 digests in lowercase hex. Keys are kept sorted so an
//! unchanged registry always serializes to the same bytes.

use crate::corpus::CorpusEntry;
use crate::error::Result;
use crate::storage::atomic::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

/// BLAKE3 content hash as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub hash: String,
    pub indexed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub indexed_files: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Read the registry at `path`. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No registry at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Atomically overwrite the registry at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes)
    }

    pub fn len(&self) -> usize {
        self.indexed_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed_files.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.indexed_files.get(id)
    }

    /// Whether `id` was last embedded with exactly this content hash.
    pub fn is_current(&self, id: &str, hash: &str) -> bool {
        self.indexed_files
            .get(id)
            .is_some_and(|entry| entry.hash == hash)
    }

    /// Ids in `listing` that are new or whose hash changed, in listing order.
    pub fn diff(&self, listing: &[CorpusEntry]) -> Vec<String> {
        listing
            .iter()
            .filter(|entry| !self.is_current(&entry.id, &entry.content_hash))
            .map(|entry| entry.id.clone())
            .collect()
    }

    /// Registered ids that no longer appear in `listing`.
    pub fn stale(&self, listing: &[CorpusEntry]) -> Vec<String> {
        let present: HashSet<&str> = listing.iter().map(|e| e.id.as_str()).collect();
        self.indexed_files
            .keys()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn record(&mut self, id: impl Into<String>, hash: impl Into<String>, at: DateTime<Utc>) {
        self.indexed_files.insert(
            id.into(),
            RegistryEntry {
                hash: hash.into(),
                indexed_at: at,
            },
        );
    }
}
