//! Aggregation of per-file outcomes into a scan verdict
//!
//! Architecture: Aggregate Root - ScanReport owns the ordered issue list
//! - Only non-compliant outcomes are kept, in discovery order
//! - The summary keeps the candidate count so empty scans stay distinguishable

use crate::domain::outcome::{DiscoveryWarning, EvaluationErrorKind, Evaluation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process exit code for a clean scan or one with nothing to check
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code when violations or evaluation errors were reported
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code for usage and configuration errors
pub const EXIT_USAGE: i32 = 2;

/// Overall result of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    pub fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Summary statistics for a scan report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Policy family the scan ran
    pub policy: String,
    /// Number of candidate files discovered and evaluated
    pub candidates: usize,
    /// Files that satisfied the policy
    pub compliant: usize,
    /// Files the policy rejected
    pub non_compliant: usize,
    /// Files the policy could not evaluate
    pub evaluation_errors: usize,
    /// Evaluation errors caused by a missing external tool
    pub tool_unavailable: usize,
    /// Set when the policy could not run at all, e.g. its tool is missing
    #[serde(default)]
    pub unavailable: Option<String>,
    /// Directories or roots discovery had to skip
    pub warnings: Vec<DiscoveryWarning>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when the scan was performed
    pub scanned_at: DateTime<Utc>,
}

/// Ordered non-compliant outcomes plus the overall verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Every non-compliant evaluation, in discovery order
    pub entries: Vec<Evaluation>,
    pub summary: ScanSummary,
    pub verdict: Verdict,
    /// Configuration used for this scan
    pub config_fingerprint: Option<String>,
}

impl ScanReport {
    /// Build a report from evaluations given in discovery order
    pub fn aggregate(policy: impl Into<String>, evaluations: Vec<Evaluation>) -> Self {
        let mut summary = ScanSummary {
            policy: policy.into(),
            candidates: evaluations.len(),
            scanned_at: Utc::now(),
            ..Default::default()
        };

        let mut entries = Vec::new();
        for evaluation in evaluations {
            if evaluation.outcome.is_compliant() {
                summary.compliant += 1;
                continue;
            }

            if evaluation.outcome.is_violation() {
                summary.non_compliant += 1;
            } else {
                summary.evaluation_errors += 1;
                if evaluation.outcome.error_kind() == Some(EvaluationErrorKind::ToolUnavailable) {
                    summary.tool_unavailable += 1;
                }
            }
            entries.push(evaluation);
        }

        let verdict = if entries.is_empty() { Verdict::Pass } else { Verdict::Fail };

        Self { entries, summary, verdict, config_fingerprint: None }
    }

    /// Whether discovery found nothing to evaluate
    pub fn nothing_to_check(&self) -> bool {
        self.summary.candidates == 0
    }

    pub fn has_violations(&self) -> bool {
        self.summary.non_compliant > 0
    }

    pub fn has_evaluation_errors(&self) -> bool {
        self.summary.evaluation_errors > 0
    }

    /// Whether the policy's tool is missing, or every reported problem is a missing tool
    pub fn tool_unavailable(&self) -> bool {
        self.summary.unavailable.is_some()
            || (self.summary.tool_unavailable > 0 && self.summary.tool_unavailable == self.entries.len())
    }

    /// Record that the policy could not run; the scan fails even with nothing to check
    pub fn mark_unavailable(&mut self, detail: impl Into<String>) {
        self.summary.unavailable = Some(detail.into());
        self.verdict = Verdict::Fail;
    }

    /// Evaluations the policy rejected
    pub fn violations(&self) -> impl Iterator<Item = &Evaluation> {
        self.entries.iter().filter(|e| e.outcome.is_violation())
    }

    /// Evaluations the policy could not complete
    pub fn evaluation_errors(&self) -> impl Iterator<Item = &Evaluation> {
        self.entries.iter().filter(|e| e.outcome.is_evaluation_error())
    }

    /// Exit code a command-line caller should return for this report
    pub fn exit_code(&self) -> i32 {
        match self.verdict {
            Verdict::Pass => EXIT_SUCCESS,
            Verdict::Fail => EXIT_FAILURE,
        }
    }

    pub fn set_warnings(&mut self, warnings: Vec<DiscoveryWarning>) {
        self.summary.warnings = warnings;
    }

    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }
}
