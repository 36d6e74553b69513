//! Metadata store: the provenance of each vector, by position.
//!
//! Record `i` describes vector `i` of the vector index. The store is persisted as
//! a pretty-printed JSON array so it can be inspected and diffed by hand.

use crate::cases::CaseRecord;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What was embedded at one index position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Identifier of the source document or case row
    pub source: String,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// The exact text that was embedded
    pub text: String,
    /// Case attributes, present only for case-row corpora
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<CaseRecord>,
}

impl MetadataRecord {
    pub fn new(source: impl Into<String>, chunk_index: usize, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            chunk_index,
            text: text.into(),
            case: None,
        }
    }

    pub fn with_case(mut self, case: CaseRecord) -> Self {
        self.case = Some(case);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    records: Vec<MetadataRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MetadataRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&MetadataRecord> {
        self.records.get(position)
    }

    pub fn push(&mut self, record: MetadataRecord) {
        self.records.push(record);
    }

    pub fn extend<I: IntoIterator<Item = MetadataRecord>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.records.iter()
    }

    /// Number of records per source, for documents indexed more than once.
    pub fn records_for(&self, source: &str) -> usize {
        self.records.iter().filter(|r| r.source == source).count()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        super::atomic::write_atomic(path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_store_round_trip_keeps_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("metadata.json");

        let mut store = MetadataStore::new();
        store.push(MetadataRecord::new("b.pdf", 0, "beta"));
        store.push(MetadataRecord::new("a.pdf", 0, "alpha"));
        store.push(
            MetadataRecord::new("case-42", 0, "Case ID: 42").with_case(CaseRecord {
                case_id: Some("42".to_string()),
                owner: Some("alice".to_string()),
                aging: 9.0,
                ..CaseRecord::default()
            }),
        );
        store.save(&path)?;

        let loaded = MetadataStore::load(&path)?;
        assert_eq!(loaded, store);
        assert_eq!(loaded.get(1).map(|r| r.source.as_str()), Some("a.pdf"));
        assert_eq!(loaded.get(2).and_then(|r| r.case.as_ref()).map(|c| c.aging), Some(9.0));
        assert!(loaded.get(3).is_none());
        Ok(())
    }

    #[test]
    fn test_document_records_omit_case_field() -> Result<()> {
        let json = serde_json::to_string(&MetadataRecord::new("doc.txt", 2, "text"))?;
        assert_eq!(json, r#"{"source":"doc.txt","chunk_index":2,"text":"text"}"#);
        Ok(())
    }

    #[test]
    fn test_records_for() {
        let store = MetadataStore::from_records(vec![
            MetadataRecord::new("a", 0, "x"),
            MetadataRecord::new("a", 1, "y"),
            MetadataRecord::new("b", 0, "z"),
        ]);
        assert_eq!(store.records_for("a"), 2);
        assert_eq!(store.records_for("c"), 0);
    }
}
