//! Workload insights over case rows.
//!
//! Answers "what is on this person's plate" and "what is this case" from the
//! same case export the index is built from. Everything here is pure and
//! synchronous over an in-memory [`CaseBook`].
//!
//! A case is **pending** when its lower-cased status is not one of `resolved`,
//! `invalid` or `closed`. Pending cases older than 7 days are **overdue**, and
//! those older than 21 days are **critical** (critical cases are also overdue).

use crate::cases::CaseRecord;
use crate::retrieval::retriever::ScoredResult;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Days after which a pending case is overdue.
pub const OVERDUE_AFTER_DAYS: f64 = 7.0;
/// Days after which a pending case is critical.
pub const CRITICAL_AFTER_DAYS: f64 = 21.0;

/// Returned by [`build_recommendation`] when no result carries usable text.
pub const NO_RECOMMENDATION: &str = "No clear resolution found in historical cases.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub owner: String,
    pub total: usize,
    pub pending: usize,
    pub overdue: usize,
    pub critical: usize,
    /// Lower-cased status to case count, over all of the owner's cases
    pub status_breakdown: BTreeMap<String, usize>,
}

impl std::fmt::Display for UserSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Owner: {}", self.owner)?;
        writeln!(f, "  Total cases: {}", self.total)?;
        writeln!(f, "  Pending:     {}", self.pending)?;
        writeln!(f, "  Overdue:     {}", self.overdue)?;
        write!(f, "  Critical:    {}", self.critical)?;
        for (status, count) in &self.status_breakdown {
            let label = if status.is_empty() { "(none)" } else { status };
            write!(f, "\n    {label}: {count}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bucket {
    Pending,
    Overdue,
    Critical,
    All,
}

impl Bucket {
    pub fn contains(&self, case: &CaseRecord) -> bool {
        match self {
            Bucket::All => true,
            Bucket::Pending => case.is_pending(),
            Bucket::Overdue => case.is_pending() && case.aging > OVERDUE_AFTER_DAYS,
            Bucket::Critical => case.is_pending() && case.aging > CRITICAL_AFTER_DAYS,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Pending => write!(f, "pending"),
            Bucket::Overdue => write!(f, "overdue"),
            Bucket::Critical => write!(f, "critical"),
            Bucket::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for Bucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "open" => Ok(Bucket::Pending),
            "overdue" => Ok(Bucket::Overdue),
            "critical" => Ok(Bucket::Critical),
            "all" => Ok(Bucket::All),
            _ => Err(format!(
                "Invalid bucket: '{s}'. Valid values are: pending, overdue, critical, all"
            )),
        }
    }
}

/// What [`CaseBook::lookup`] resolved its input to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Lookup {
    Case {
        case_id: String,
        record: Option<CaseRecord>,
    },
    Owner(UserSummary),
}

/// In-memory set of case rows.
#[derive(Debug, Clone, Default)]
pub struct CaseBook {
    cases: Vec<CaseRecord>,
}

impl CaseBook {
    pub fn new(cases: Vec<CaseRecord>) -> Self {
        Self { cases }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    fn owned_by<'a, 'b>(&'a self, owner: &'b str) -> impl Iterator<Item = &'a CaseRecord> + use<'a, 'b> {
        self.cases.iter().filter(move |c| c.is_owned_by(owner))
    }

    /// Workload counts for `owner`, matched case-insensitively.
    ///
    /// An unknown owner gets an all-zero summary.
    pub fn user_summary(&self, owner: &str) -> UserSummary {
        let mut summary = UserSummary {
            owner: owner.trim().to_string(),
            ..UserSummary::default()
        };
        for case in self.owned_by(owner) {
            summary.total += 1;
            *summary.status_breakdown.entry(case.status_key()).or_default() += 1;
            if Bucket::Pending.contains(case) {
                summary.pending += 1;
            }
            if Bucket::Overdue.contains(case) {
                summary.overdue += 1;
            }
            if Bucket::Critical.contains(case) {
                summary.critical += 1;
            }
        }
        summary
    }

    /// Up to `top_n` of the owner's cases in `bucket`, oldest first.
    ///
    /// Equal aging is ordered by case id.
    pub fn cases_in_bucket(&self, owner: &str, bucket: Bucket, top_n: usize) -> Vec<&CaseRecord> {
        let mut cases: Vec<&CaseRecord> = self
            .owned_by(owner)
            .filter(|c| bucket.contains(c))
            .collect();
        cases.sort_by(|a, b| {
            b.aging
                .partial_cmp(&a.aging)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.case_id.cmp(&b.case_id))
        });
        cases.truncate(top_n);
        cases
    }

    /// The first case whose id equals `case_id` (surrounding whitespace ignored).
    pub fn case_details(&self, case_id: &str) -> Option<&CaseRecord> {
        let wanted = case_id.trim();
        self.cases
            .iter()
            .find(|c| c.case_id.as_deref().map(str::trim) == Some(wanted))
    }

    /// All-digit input is a case id, anything else an owner name.
    pub fn lookup(&self, input: &str) -> Lookup {
        let input = input.trim();
        if is_case_id(input) {
            Lookup::Case {
                case_id: input.to_string(),
                record: self.case_details(input).cloned(),
            }
        } else {
            Lookup::Owner(self.user_summary(input))
        }
    }
}

pub fn is_case_id(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
}

/// Bullet list of suggested resolutions from the best `top_n` similar results.
///
/// Each result contributes its case resolution, else its case details, else the
/// indexed chunk text. Blank values are skipped.
pub fn build_recommendation(results: &[ScoredResult], top_n: usize) -> String {
    let lines: Vec<String> = results
        .iter()
        .take(top_n)
        .filter_map(|r| {
            let case = r.record.case.as_ref();
            [
                case.and_then(|c| c.resolution.as_deref()),
                case.and_then(|c| c.details.as_deref()),
                Some(r.record.text.as_str()),
            ]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(|text| format!("• {text}"))
        })
        .collect();

    if lines.is_empty() {
        NO_RECOMMENDATION.to_string()
    } else {
        lines.join("\n")
    }
}
