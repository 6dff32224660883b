//! Core domain models for per-file compliance outcomes
//!
//! Architecture: Rich Domain Models - outcomes carry their own classification
//! - CandidateFile is identified by its canonical path, never by how it was reached
//! - Outcome separates genuine violations from policies that could not run
//! - ComplianceError covers the failures that abort a run before a verdict exists

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A discovered file eligible for policy evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateFile {
    /// Absolute canonical path of the file
    pub path: PathBuf,
    /// Lower-cased extension without the leading dot
    pub extension: Option<String>,
}

impl CandidateFile {
    /// Create a candidate from an already canonical path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        Self { path, extension }
    }

    /// File name without its extension, as used by naming conventions
    pub fn display_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path shown to users, relative to `root` when the file lives under it
    pub fn display_path(&self, root: Option<&Path>) -> String {
        root.and_then(|root| self.path.strip_prefix(root).ok())
            .filter(|relative| !relative.as_os_str().is_empty())
            .unwrap_or(&self.path)
            .display()
            .to_string()
    }
}

impl fmt::Display for CandidateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Why a policy could not produce a verdict for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationErrorKind {
    /// The external tool backing the policy is not installed or not on PATH
    ToolUnavailable,
    /// The external tool ran but exited for reasons unrelated to compliance
    ToolFailed,
    /// The external tool exceeded the configured timeout and was killed
    TimedOut,
    /// The file could not be read for comparison
    Io,
    /// The policy panicked while evaluating the file
    Panicked,
}

impl EvaluationErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToolUnavailable => "tool unavailable",
            Self::ToolFailed => "tool failed",
            Self::TimedOut => "timed out",
            Self::Io => "read error",
            Self::Panicked => "policy panicked",
        }
    }
}

/// Result of evaluating one file against one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Compliant,
    NonCompliant {
        reason: Option<String>,
    },
    EvaluationError {
        kind: EvaluationErrorKind,
        detail: String,
    },
}

impl Outcome {
    /// A violation with an explanation
    pub fn non_compliant(reason: impl Into<String>) -> Self {
        Self::NonCompliant { reason: Some(reason.into()) }
    }

    /// A violation the policy does not explain further
    pub fn violation() -> Self {
        Self::NonCompliant { reason: None }
    }

    /// The policy could not run for this file
    pub fn evaluation_error(kind: EvaluationErrorKind, detail: impl Into<String>) -> Self {
        Self::EvaluationError { kind, detail: detail.into() }
    }

    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant)
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Self::NonCompliant { .. })
    }

    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, Self::EvaluationError { .. })
    }

    /// Error kind, if this outcome is an evaluation error
    pub fn error_kind(&self) -> Option<EvaluationErrorKind> {
        match self {
            Self::EvaluationError { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Short status label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant { .. } => "non-compliant",
            Self::EvaluationError { .. } => "error",
        }
    }

    /// Human-readable detail, empty when there is nothing to add
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Compliant => None,
            Self::NonCompliant { reason } => reason.clone(),
            Self::EvaluationError { kind, detail } => {
                if detail.is_empty() {
                    Some(kind.as_str().to_string())
                } else {
                    Some(format!("{}: {}", kind.as_str(), detail))
                }
            }
        }
    }
}

/// A file paired with the outcome its policy produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub file: CandidateFile,
    pub outcome: Outcome,
}

impl Evaluation {
    pub fn new(file: CandidateFile, outcome: Outcome) -> Self {
        Self { file, outcome }
    }

    /// Format the evaluation for single-line display
    pub fn format_display(&self, root: Option<&Path>) -> String {
        match self.outcome.detail() {
            Some(detail) => format!("{} ({})", self.file.display_path(root), detail),
            None => self.file.display_path(root),
        }
    }
}

/// A directory or search root that discovery had to skip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryWarning {
    pub path: PathBuf,
    pub message: String,
}

impl DiscoveryWarning {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

/// Errors that abort a scan before a verdict can be produced
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    /// Mandatory input is missing or the configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Glob or regex compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// Naming rules table could not be loaded
    #[error("Rules error in {path}: {message}")]
    Rules { path: String, message: String },

    /// Report could not be rendered
    #[error("Report error: {message}")]
    Report { message: String },

    /// The runtime could not set up evaluation, e.g. no worker threads
    #[error("Execution error: {message}")]
    Execution { message: String },
}

impl ComplianceError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into() }
    }

    /// Create a rules table error
    pub fn rules(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rules { path: path.into(), message: message.into() }
    }

    /// Create a report rendering error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report { message: message.into() }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution { message: message.into() }
    }

    /// Whether the error stems from caller input rather than the environment
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Pattern { .. } | Self::Rules { .. })
    }
}

/// Result type for compliance operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;
