//! Core domain types for ceofinder runs.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// One company row loaded from the input table.
///
/// Identity is the row position in the source table; duplicate company names
/// are permitted and processed independently. `passthrough` holds the
/// original cells in source column order and is never altered by enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Zero-based position in the source table.
    pub row_index: usize,
    /// Company name (required, may still be empty in malformed rows).
    pub company: String,
    /// Pre-existing CEO name, if the input carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceo_name: Option<String>,
    /// Pre-existing CEO title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceo_title: Option<String>,
    /// Pre-existing CEO email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceo_email: Option<String>,
    /// Pre-existing CEO LinkedIn profile URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceo_linkedin: Option<String>,
    /// Company website/domain hint, if the input carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Company LinkedIn page hint (distinct from the CEO profile).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_linkedin: Option<String>,
    /// Confidence label from a previous run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    /// Source tag from a previous run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// The full original row, untouched.
    pub passthrough: Vec<String>,
}

impl CompanyRecord {
    /// Whether this row already carries a usable CEO name.
    ///
    /// Placeholder values written by earlier failed runs do not count.
    pub fn has_ceo(&self) -> bool {
        match self.ceo_name.as_deref() {
            Some(name) => {
                let trimmed = name.trim();
                !trimmed.is_empty()
                    && !matches!(
                        trimmed.to_ascii_lowercase().as_str(),
                        "not found" | "error" | "unknown" | "n/a"
                    )
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate / EnrichmentResult
// ---------------------------------------------------------------------------

/// A proposed CEO answer from one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    /// Proposed CEO name.
    pub name: String,
    /// Role/title, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Contact email, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// LinkedIn profile URL, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    /// Provider-reported confidence ("high"/"medium"/"low").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

/// Outcome classification for one enriched row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    /// A plausible candidate was accepted.
    Found,
    /// No provider produced a plausible candidate.
    NotFound,
    /// A candidate was accepted but a later consulted provider disagreed
    /// (earlier-priority name wins; this flag is informational).
    Ambiguous,
}

/// The pipeline's answer for one row. Created per row, consumed by the
/// merge step, not retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Accepted candidate, when status is `Found` or `Ambiguous`.
    pub candidate: Option<Candidate>,
    /// Outcome classification.
    pub status: EnrichmentStatus,
    /// Name of the provider that produced the accepted answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl EnrichmentResult {
    /// A `NotFound` result with no candidate.
    pub fn not_found() -> Self {
        Self {
            candidate: None,
            status: EnrichmentStatus::NotFound,
            source: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Processing mode for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Every row is (re-)processed regardless of existing CEO field.
    All,
    /// Rows with a non-empty existing CEO are skipped and counted as
    /// already succeeded.
    MissingOnly,
    /// Processing begins at the supplied row index; earlier rows keep
    /// their previous result and are not re-enriched.
    Resume { start_index: usize },
}

/// Controller lifecycle. `Completed` and `Cancelled` are terminal; a new
/// run must reinitialize [`RunState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

/// Aggregate counters for a run. Mutated only by the run controller;
/// counters are monotonically non-decreasing within a run and reset only
/// at run start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub mode: RunMode,
    pub phase: RunPhase,
    /// Total rows in the table.
    pub total: usize,
    /// Rows actually run through the enrichment pipeline. Rows skipped by
    /// mode policy do not count.
    pub processed: usize,
    /// Rows with a usable CEO name after the run, including rows skipped
    /// as already-succeeded in missing-only mode.
    pub succeeded: usize,
    /// Enriched rows where no plausible CEO was found.
    pub failed: usize,
}

impl RunState {
    pub fn new(mode: RunMode, total: usize) -> Self {
        Self {
            mode,
            phase: RunPhase::Idle,
            total,
            processed: 0,
            succeeded: 0,
            failed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Per-row outcome carried by progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Found,
    NotFound,
    AlreadyHadCeo,
}

/// Immutable snapshot published by the worker after each row. The display
/// layer only reads these; it never reaches into worker-owned state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// Run started; carries the initial state.
    Started { state: RunState },
    /// One row finished (or was skipped by mode policy).
    Row {
        row_index: usize,
        company: String,
        outcome: RowOutcome,
        /// Provider that produced the answer, for found rows.
        source: Option<String>,
        state: RunState,
    },
    /// A provider was disabled for the remainder of the run.
    ProviderDisabled { provider: String, reason: String },
    /// Run reached a terminal phase.
    Finished { state: RunState },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ceo: Option<&str>) -> CompanyRecord {
        CompanyRecord {
            row_index: 0,
            company: "Acme Inc".into(),
            ceo_name: ceo.map(String::from),
            ceo_title: None,
            ceo_email: None,
            ceo_linkedin: None,
            website: None,
            company_linkedin: None,
            confidence: None,
            source: None,
            passthrough: vec!["Acme Inc".into()],
        }
    }

    #[test]
    fn has_ceo_ignores_placeholders() {
        assert!(!record(None).has_ceo());
        assert!(!record(Some("")).has_ceo());
        assert!(!record(Some("  ")).has_ceo());
        assert!(!record(Some("Not found")).has_ceo());
        assert!(!record(Some("ERROR")).has_ceo());
        assert!(record(Some("Jane Doe")).has_ceo());
    }

    #[test]
    fn run_state_starts_idle_and_zeroed() {
        let state = RunState::new(RunMode::All, 10);
        assert_eq!(state.phase, RunPhase::Idle);
        assert_eq!(state.processed, 0);
        assert_eq!(state.succeeded, 0);
        assert_eq!(state.failed, 0);
        assert_eq!(state.total, 10);
    }

    #[test]
    fn progress_event_serializes() {
        let event = ProgressEvent::Row {
            row_index: 3,
            company: "Globex".into(),
            outcome: RowOutcome::Found,
            source: Some("openai".into()),
            state: RunState::new(RunMode::MissingOnly, 5),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("Globex"));
        assert!(json.contains("found"));
    }
}
