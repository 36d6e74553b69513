use serde::{Deserialize, Serialize};

/// How an indexing run treats the existing artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IndexingMode {
    /// Embed only new or changed documents and append them to the existing index.
    /// An unchanged corpus is a no-op that writes nothing.
    #[default]
    Incremental,

    /// Ignore the registry and existing artifacts, embed every document, and
    /// replace the artifacts once the new index holds at least one document.
    /// This is the only way to drop vectors of modified or removed documents.
    FullRebuild,
}

impl IndexingMode {
    /// Check if this mode discards existing artifacts before indexing
    pub fn discards_existing(&self) -> bool {
        matches!(self, IndexingMode::FullRebuild)
    }
}

impl std::fmt::Display for IndexingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexingMode::Incremental => write!(f, "incremental"),
            IndexingMode::FullRebuild => write!(f, "full-rebuild"),
        }
    }
}

impl std::str::FromStr for IndexingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incremental" | "incr" => Ok(IndexingMode::Incremental),
            "full-rebuild" | "full_rebuild" | "rebuild" | "full" => Ok(IndexingMode::FullRebuild),
            _ => Err(format!(
                "Invalid indexing mode: '{s}'. Valid values are: incremental, full-rebuild"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexing_mode_properties() {
        assert!(!IndexingMode::Incremental.discards_existing());
        assert!(IndexingMode::FullRebuild.discards_existing());
        assert_eq!(IndexingMode::default(), IndexingMode::Incremental);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "incremental".parse::<IndexingMode>().unwrap(),
            IndexingMode::Incremental
        );
        assert_eq!(
            "Full-Rebuild".parse::<IndexingMode>().unwrap(),
            IndexingMode::FullRebuild
        );
        assert_eq!(
            "REBUILD".parse::<IndexingMode>().unwrap(),
            IndexingMode::FullRebuild
        );
        assert!("read-only".parse::<IndexingMode>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(IndexingMode::Incremental.to_string(), "incremental");
        assert_eq!(IndexingMode::FullRebuild.to_string(), "full-rebuild");
    }
}
