//! Corpus sources: where documents come from and how their text is extracted.
//!
//! ## Key Components
//!
//! - **Corpus**: async trait the indexer consumes (tests provide in-memory fakes)
//! - **DocumentCorpus**: a flat directory of `.pdf`, `.txt` and `.md` files
//! - **CaseCorpus**: a JSON Lines export of support cases, one case per line
//!
//! Listing is cheap and content-addressed: every entry carries the BLAKE3 hash of
//! its raw bytes, which the registry compares against the last indexed hash.
//! Extraction only happens in [`Corpus::load`], for documents that changed.

use crate::cases::{CaseRecord, CaseSchema};
use crate::error::{Result, RetrieverError};
use crate::registry::content_hash;
use async_trait::async_trait;
use ignore::WalkBuilder;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File extensions picked up by [`DocumentCorpus`], compared case-insensitively.
pub const DOCUMENT_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// A document as seen by the change tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub id: String,
    pub content_hash: String,
}

/// How a document's text is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    /// Fixed-size word windows, short windows dropped
    Words,
    /// The whole text is one chunk
    Whole,
}

/// Extracted text of one document, ready for chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub id: String,
    pub text: String,
    /// Case attributes to carry into the metadata store
    pub case: Option<CaseRecord>,
    pub chunking: ChunkMode,
}

#[async_trait]
pub trait Corpus: Send + Sync {
    /// All documents currently in the corpus, sorted by id.
    async fn list(&self) -> Result<Vec<CorpusEntry>>;

    /// Extract one document's text.
    ///
    /// Fails with [`RetrieverError::CorpusRead`] when this document alone cannot
    /// be read. The indexer skips it and moves on.
    async fn load(&self, id: &str) -> Result<ExtractedDocument>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// PDF and plain-text files directly inside one directory.
///
/// Subdirectories and hidden files are not indexed. The document id is the file
/// name, so names must be unique within the directory.
#[derive(Debug, Clone)]
pub struct DocumentCorpus {
    dir: PathBuf,
}

impl DocumentCorpus {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn is_document(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                DOCUMENT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }

    fn scan(dir: &Path) -> Result<Vec<CorpusEntry>> {
        // Every document in the directory is part of the corpus, whatever
        // ignore files around it say. Only dot-files are skipped.
        let mut builder = WalkBuilder::new(dir);
        builder
            .max_depth(Some(1))
            .standard_filters(false)
            .hidden(true);

        let mut entries = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if !Self::is_document(path) {
                debug!("Ignoring non-document file {}", path.display());
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("Skipping file with non-UTF-8 name: {}", path.display());
                continue;
            };
            match std::fs::read(path) {
                Ok(bytes) => entries.push(CorpusEntry {
                    id: name.to_string(),
                    content_hash: content_hash(&bytes),
                }),
                Err(e) => warn!("Skipping unreadable file {}: {e}", path.display()),
            }
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }
}

#[async_trait]
impl Corpus for DocumentCorpus {
    async fn list(&self) -> Result<Vec<CorpusEntry>> {
        if !self.dir.is_dir() {
            return Err(RetrieverError::configuration(format!(
                "corpus directory {} does not exist",
                self.dir.display()
            )));
        }
        let dir = self.dir.clone();
        let entries = tokio::task::spawn_blocking(move || Self::scan(&dir)).await??;
        info!("Found {} documents in {}", entries.len(), self.dir.display());
        Ok(entries)
    }

    async fn load(&self, id: &str) -> Result<ExtractedDocument> {
        let path = self.dir.join(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RetrieverError::corpus_read(id, e))?;

        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

        let text = if is_pdf {
            // Malformed PDFs can panic inside the parser; that stays local to this document
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| RetrieverError::corpus_read(id, e))?
                .map_err(|e| RetrieverError::corpus_read(id, e))?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        Ok(ExtractedDocument {
            id: id.to_string(),
            text,
            case: None,
            chunking: ChunkMode::Words,
        })
    }

    fn describe(&self) -> String {
        format!("documents in {}", self.dir.display())
    }
}

#[derive(Debug, Clone)]
struct CaseRow {
    hash: String,
    record: CaseRecord,
}

/// Support cases read from a JSON Lines file.
///
/// Each non-blank line is one JSON object. The document id is `case-<case id>`,
/// or `case-row-<line>` when the row has no case id. When two rows share an id
/// the later one wins. Lines that are not JSON objects are skipped with a
/// warning.
#[derive(Debug, Clone)]
pub struct CaseCorpus {
    path: PathBuf,
    schema: CaseSchema,
    rows: BTreeMap<String, CaseRow>,
}

impl CaseCorpus {
    /// Read and map every row of `path`.
    ///
    /// With `schema.detect` set, the mapping is guessed from the first row's keys.
    pub fn open<P: AsRef<Path>>(path: P, schema: CaseSchema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            RetrieverError::configuration(format!(
                "cannot read case file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_jsonl(path, &raw, schema)
    }

    /// Build from JSON Lines text already in memory. `path` only labels logs.
    pub fn from_jsonl(path: PathBuf, raw: &str, schema: CaseSchema) -> Result<Self> {
        let mut parsed: Vec<(usize, String, Map<String, Value>)> = Vec::new();
        for (line_no, line) in raw.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(row)) => parsed.push((line_no, line.to_string(), row)),
                Ok(_) => warn!("{}:{line_no}: not a JSON object, skipping", path.display()),
                Err(e) => warn!("{}:{line_no}: invalid JSON ({e}), skipping", path.display()),
            }
        }

        let schema = match (schema.detect, parsed.first()) {
            (true, Some((_, _, first))) => {
                let columns: Vec<String> = first.keys().cloned().collect();
                CaseSchema::detect(&columns)?
            }
            _ => schema,
        };

        let mut rows = BTreeMap::new();
        for (line_no, line, row) in parsed {
            let record = schema.extract(&row);
            let id = match &record.case_id {
                Some(case_id) => format!("case-{case_id}"),
                None => format!("case-row-{line_no}"),
            };
            let hash = content_hash(line.as_bytes());
            if rows.insert(id.clone(), CaseRow { hash, record }).is_some() {
                warn!(
                    "{}:{line_no}: duplicate {id}, keeping the later row",
                    path.display()
                );
            }
        }

        info!("Loaded {} case rows from {}", rows.len(), path.display());
        Ok(Self { path, schema, rows })
    }

    pub fn schema(&self) -> &CaseSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All case records, ordered by document id.
    pub fn records(&self) -> Vec<CaseRecord> {
        self.rows.values().map(|row| row.record.clone()).collect()
    }
}

#[async_trait]
impl Corpus for CaseCorpus {
    async fn list(&self) -> Result<Vec<CorpusEntry>> {
        Ok(self
            .rows
            .iter()
            .map(|(id, row)| CorpusEntry {
                id: id.clone(),
                content_hash: row.hash.clone(),
            })
            .collect())
    }

    async fn load(&self, id: &str) -> Result<ExtractedDocument> {
        let row = self
            .rows
            .get(id)
            .ok_or_else(|| RetrieverError::corpus_read(id, "no such case row"))?;
        Ok(ExtractedDocument {
            id: id.to_string(),
            text: row.record.embedding_text(),
            case: Some(row.record.clone()),
            chunking: ChunkMode::Whole,
        })
    }

    fn describe(&self) -> String {
        format!("cases in {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_document_listing_is_sorted_and_filtered() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("b.txt"), "beta")?;
        std::fs::write(dir.path().join("a.MD"), "alpha")?;
        std::fs::write(dir.path().join("notes.csv"), "x,y")?;
        std::fs::write(dir.path().join(".hidden.txt"), "secret")?;
        std::fs::create_dir(dir.path().join("nested"))?;
        std::fs::write(dir.path().join("nested").join("deep.txt"), "deep")?;

        let corpus = DocumentCorpus::new(dir.path());
        let listing = corpus.list().await?;
        let ids: Vec<&str> = listing.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a.MD", "b.txt"]);
        assert_eq!(listing[1].content_hash, content_hash(b"beta"));

        let doc = corpus.load("b.txt").await?;
        assert_eq!(doc.text, "beta");
        assert_eq!(doc.chunking, ChunkMode::Words);
        assert!(doc.case.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_ignores_gitignore_rules() -> Result<()> {
        let repo = tempdir()?;
        std::fs::create_dir(repo.path().join(".git"))?;
        std::fs::write(repo.path().join(".gitignore"), "*.pdf\n")?;
        std::fs::write(repo.path().join(".ignore"), "*.md\n")?;

        let docs = repo.path().join("docs");
        std::fs::create_dir(&docs)?;
        std::fs::write(docs.join(".gitignore"), "notes.txt\n")?;
        std::fs::write(docs.join("manual.pdf"), b"%PDF-1.4")?;
        std::fs::write(docs.join("guide.md"), "guide")?;
        std::fs::write(docs.join("notes.txt"), "notes")?;

        let listing = DocumentCorpus::new(&docs).list().await?;
        let ids: Vec<&str> = listing.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["guide.md", "manual.pdf", "notes.txt"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_directory_is_configuration_error() {
        let corpus = DocumentCorpus::new("/definitely/not/here");
        let err = corpus.list().await.unwrap_err();
        assert!(matches!(err, RetrieverError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_broken_pdf_is_corpus_read_error() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4 not really")?;
        let corpus = DocumentCorpus::new(dir.path());
        let err = corpus.load("broken.pdf").await.unwrap_err();
        assert!(matches!(err, RetrieverError::CorpusRead { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_case_corpus_rows() -> Result<()> {
        let raw = r#"
{"caseid": 7, "category": "VPN", "details": "drops", "resolution": "reinstall", "statuscode": "Open", "aging": 9, "currentowner": "alice"}
not json
{"category": "Email", "details": "bounce", "resolution": "fix MX"}
{"caseid": 7, "category": "VPN", "details": "drops hourly", "resolution": "new client", "statuscode": "Closed"}
"#;
        let corpus = CaseCorpus::from_jsonl(PathBuf::from("cases.jsonl"), raw, CaseSchema::default())?;
        assert_eq!(corpus.len(), 2);

        let listing = corpus.list().await?;
        let ids: Vec<&str> = listing.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["case-7", "case-row-4"]);

        let doc = corpus.load("case-7").await?;
        assert_eq!(doc.chunking, ChunkMode::Whole);
        assert_eq!(
            doc.text,
            "Case ID: 7 | Category: VPN | Issue: drops hourly | Resolution: new client"
        );
        assert_eq!(doc.case.and_then(|c| c.status), Some("Closed".to_string()));

        assert!(corpus.load("case-99").await.is_err());
        Ok(())
    }

    #[test]
    fn test_case_corpus_detects_schema() -> Result<()> {
        let raw = r#"{"ticket": "T1", "type": "Access", "issue": "locked out", "fix": "reset", "status": "open", "owner": "bob"}"#;
        let schema = CaseSchema {
            detect: true,
            ..CaseSchema::default()
        };
        let corpus = CaseCorpus::from_jsonl(PathBuf::from("x.jsonl"), raw, schema)?;
        assert_eq!(corpus.schema().resolution, "fix");
        assert_eq!(corpus.schema().owner, "owner");

        let records = corpus.records();
        assert_eq!(records[0].summary.as_deref(), Some("locked out"));
        assert_eq!(records[0].owner.as_deref(), Some("bob"));
        Ok(())
    }
}
