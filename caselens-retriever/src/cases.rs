//! Case rows and the schema that maps raw columns onto them.
//!
//! A case export is a table whose column names vary between sources. Rather than
//! guessing at every load, a [`CaseSchema`] names the raw column for each field.
//! The default schema matches the reference export (`caseid`, `statuscode`,
//! `currentowner`, ...). [`CaseSchema::detect`] is a fallback for unknown exports:
//! it picks columns by keyword, and only runs when `detect = true` is configured.

use crate::error::{Result, RetrieverError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// Statuses that close a case, compared lower-cased.
pub const CLOSED_STATUSES: [&str; 3] = ["resolved", "invalid", "closed"];

/// Raw column names for each case field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseSchema {
    /// Bumped whenever the meaning of a mapping changes
    pub version: u32,
    /// Ignore the mapping below and pick columns by keyword
    pub detect: bool,
    pub case_id: String,
    pub category: String,
    pub summary: String,
    pub resolution: String,
    pub status: String,
    pub aging: String,
    pub owner: String,
    pub reported_on: String,
    pub close_date: String,
    pub subject: String,
    pub details: String,
}

impl Default for CaseSchema {
    fn default() -> Self {
        Self {
            version: 1,
            detect: false,
            case_id: "caseid".to_string(),
            category: "category".to_string(),
            summary: "details".to_string(),
            resolution: "resolution".to_string(),
            status: "statuscode".to_string(),
            aging: "aging".to_string(),
            owner: "currentowner".to_string(),
            reported_on: "reportedon".to_string(),
            close_date: "closedate".to_string(),
            subject: "subject".to_string(),
            details: "details".to_string(),
        }
    }
}

/// First column (in column order) whose lower-cased name contains any keyword.
fn find_column(columns: &[String], keywords: &[&str]) -> Option<String> {
    columns
        .iter()
        .find(|col| {
            let col = col.to_lowercase();
            keywords.iter().any(|kw| col.contains(kw))
        })
        .cloned()
}

impl CaseSchema {
    /// Guess a mapping from column names.
    ///
    /// The four embedded fields fall back to the first four columns by position
    /// when no keyword matches, so at least four columns are required. The
    /// remaining fields keep their default names when nothing matches.
    pub fn detect(columns: &[String]) -> Result<Self> {
        if columns.len() < 4 {
            return Err(RetrieverError::configuration(format!(
                "cannot detect a case schema from {} columns (need at least 4)",
                columns.len()
            )));
        }

        let defaults = Self::default();
        let pick = |keywords: &[&str], fallback: String| {
            find_column(columns, keywords).unwrap_or(fallback)
        };

        let schema = Self {
            version: defaults.version,
            detect: true,
            case_id: pick(&["case", "id"], columns[0].clone()),
            category: pick(&["category", "type"], columns[1].clone()),
            summary: pick(
                &["summary", "issue", "description", "details", "subject"],
                columns[2].clone(),
            ),
            resolution: pick(&["resolution", "fix", "solution"], columns[3].clone()),
            status: pick(&["status"], defaults.status),
            aging: pick(&["aging", "age"], defaults.aging),
            owner: pick(&["owner", "assignee"], defaults.owner),
            reported_on: pick(&["reported", "opened", "created"], defaults.reported_on),
            close_date: pick(&["close"], defaults.close_date),
            subject: pick(&["subject"], defaults.subject),
            details: pick(&["details", "description"], defaults.details),
        };

        info!(
            "Detected case schema: case_id={}, category={}, summary={}, resolution={}, status={}, owner={}, aging={}",
            schema.case_id,
            schema.category,
            schema.summary,
            schema.resolution,
            schema.status,
            schema.owner,
            schema.aging
        );
        Ok(schema)
    }

    /// Project one raw row onto a [`CaseRecord`].
    pub fn extract(&self, row: &Map<String, Value>) -> CaseRecord {
        let field = |column: &str| row.get(column).and_then(value_text);
        CaseRecord {
            case_id: field(&self.case_id),
            category: field(&self.category),
            summary: field(&self.summary),
            resolution: field(&self.resolution),
            status: field(&self.status),
            aging: field(&self.aging).map(|s| parse_aging(&s)).unwrap_or(0.0),
            owner: field(&self.owner),
            reported_on: field(&self.reported_on),
            close_date: field(&self.close_date),
            subject: field(&self.subject),
            details: field(&self.details),
        }
    }
}

/// Cell text, with blanks and nulls treated as absent.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Days open. Anything that is not a finite number counts as 0.
fn parse_aging(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// One support case. Absent fields are `None` rather than missing keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub aging: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CaseRecord {
    /// The text embedded for this case.
    pub fn embedding_text(&self) -> String {
        let show = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();
        format!(
            "Case ID: {} | Category: {} | Issue: {} | Resolution: {}",
            show(&self.case_id),
            show(&self.category),
            show(&self.summary),
            show(&self.resolution)
        )
    }

    /// Lower-cased status, empty when absent.
    pub fn status_key(&self) -> String {
        self.status.as_deref().unwrap_or("").to_lowercase()
    }

    /// Open cases are those whose status is not one of [`CLOSED_STATUSES`].
    pub fn is_pending(&self) -> bool {
        !CLOSED_STATUSES.contains(&self.status_key().as_str())
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner
            .as_deref()
            .is_some_and(|o| o.trim().eq_ignore_ascii_case(owner.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_extract_with_default_schema() {
        let record = CaseSchema::default().extract(&row(json!({
            "caseid": 1042,
            "category": "VPN",
            "details": "Tunnel drops every 5 minutes",
            "resolution": "Updated client to 5.2",
            "statuscode": "Resolved",
            "aging": "12",
            "currentowner": "alice",
            "subject": "  ",
        })));

        assert_eq!(record.case_id.as_deref(), Some("1042"));
        assert_eq!(record.summary.as_deref(), Some("Tunnel drops every 5 minutes"));
        assert_eq!(record.aging, 12.0);
        assert_eq!(record.subject, None);
        assert!(!record.is_pending());
        assert_eq!(
            record.embedding_text(),
            "Case ID: 1042 | Category: VPN | Issue: Tunnel drops every 5 minutes | Resolution: Updated client to 5.2"
        );
    }

    #[test]
    fn test_lenient_aging() {
        let schema = CaseSchema::default();
        assert_eq!(schema.extract(&row(json!({"aging": "n/a"}))).aging, 0.0);
        assert_eq!(schema.extract(&row(json!({"aging": ""}))).aging, 0.0);
        assert_eq!(schema.extract(&row(json!({"aging": 7.5}))).aging, 7.5);
        assert_eq!(schema.extract(&row(json!({}))).aging, 0.0);
    }

    #[test]
    fn test_pending_and_ownership() {
        let mut record = CaseRecord {
            status: Some("In Progress".to_string()),
            owner: Some("Alice".to_string()),
            ..CaseRecord::default()
        };
        assert!(record.is_pending());
        assert!(record.is_owned_by("alice"));
        assert!(!record.is_owned_by("bob"));

        record.status = Some("CLOSED".to_string());
        assert!(!record.is_pending());

        // No status at all is still open work
        assert!(CaseRecord::default().is_pending());
    }

    #[test]
    fn test_detect_by_keyword() -> Result<()> {
        let columns: Vec<String> = ["Ticket", "Type", "Issue Description", "Fix Applied", "Status", "Assignee", "Age"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let schema = CaseSchema::detect(&columns)?;

        assert_eq!(schema.case_id, "Ticket");
        assert_eq!(schema.category, "Type");
        assert_eq!(schema.summary, "Issue Description");
        assert_eq!(schema.resolution, "Fix Applied");
        assert_eq!(schema.status, "Status");
        assert_eq!(schema.owner, "Assignee");
        assert_eq!(schema.aging, "Age");
        assert!(schema.detect);
        Ok(())
    }

    #[test]
    fn test_detect_positional_fallback() -> Result<()> {
        let columns: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let schema = CaseSchema::detect(&columns)?;
        assert_eq!(
            (schema.case_id.as_str(), schema.category.as_str(), schema.summary.as_str(), schema.resolution.as_str()),
            ("a", "b", "c", "d")
        );
        assert_eq!(schema.status, "statuscode");

        assert!(CaseSchema::detect(&columns[..3]).is_err());
        Ok(())
    }
}
