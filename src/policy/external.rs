//! Policies backed by an external formatter or verifier
//!
//! Architectural Principle: Adapter - an external tool is wrapped behind the Policy trait
//! - `CompareStdout` runs a formatter and diffs its output against the file
//! - `ExitStatus` runs a verifier and interprets its exit code
//! - A missing tool, a crash or a timeout becomes an evaluation error, never a violation

use crate::domain::outcome::{CandidateFile, ComplianceError, ComplianceResult, EvaluationErrorKind, Outcome};
use crate::policy::process::{self, ProcessError};
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

/// Placeholder replaced by the candidate's path in tool arguments
pub const FILE_PLACEHOLDER: &str = "{file}";

/// How the external tool's result is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolMode {
    /// Tool prints the canonical formatting; any difference is a violation
    CompareStdout,
    /// Tool verifies in place; listed exit codes mean violation
    ExitStatus,
}

/// Description of how to invoke an external tool for one file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments; `{file}` is substituted with the candidate path
    pub args: Vec<String>,
    pub mode: ToolMode,
    /// Exit codes that signal non-compliance in `exit-status` mode
    #[serde(default)]
    pub violation_exit_codes: Vec<i32>,
    /// Arguments for the availability probe, e.g. `--version`
    #[serde(default)]
    pub probe_args: Option<Vec<String>>,
    /// Directory the tool runs in
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Per-invocation timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Hint printed alongside formatting violations
    #[serde(default)]
    pub remedy: Option<String>,
}

impl ToolSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>, mode: ToolMode) -> Self {
        Self {
            program: program.into(),
            args,
            mode,
            violation_exit_codes: Vec::new(),
            probe_args: None,
            working_dir: None,
            timeout_ms: None,
            remedy: None,
        }
    }

    pub fn with_probe(mut self, args: Vec<String>) -> Self {
        self.probe_args = Some(args);
        self
    }

    pub fn with_violation_exit_codes(mut self, codes: Vec<i32>) -> Self {
        self.violation_exit_codes = codes;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check the tool definition is usable before any file is evaluated
    pub fn validate(&self) -> ComplianceResult<()> {
        if self.program.trim().is_empty() {
            return Err(ComplianceError::config("External tool program must not be empty"));
        }
        if !self.args.iter().any(|arg| arg.contains(FILE_PLACEHOLDER)) {
            return Err(ComplianceError::config(format!(
                "Arguments for '{}' must reference the candidate file via {}",
                self.program, FILE_PLACEHOLDER
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(ComplianceError::config(format!("Timeout for '{}' must be positive", self.program)));
        }
        if self.mode == ToolMode::ExitStatus && self.violation_exit_codes.contains(&0) {
            return Err(ComplianceError::config(format!(
                "Exit code 0 cannot signal a violation for '{}'",
                self.program
            )));
        }
        Ok(())
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Policy that shells out to an external tool once per file
#[derive(Debug)]
pub struct ExternalToolPolicy {
    id: String,
    spec: ToolSpec,
    availability: OnceLock<Result<(), String>>,
}

impl ExternalToolPolicy {
    pub fn new(id: impl Into<String>, spec: ToolSpec) -> ComplianceResult<Self> {
        spec.validate()?;
        Ok(Self { id: id.into(), spec, availability: OnceLock::new() })
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Probe the tool once; later calls reuse the first answer
    pub fn check_available(&self) -> Result<(), String> {
        self.availability.get_or_init(|| self.probe()).clone()
    }

    fn probe(&self) -> Result<(), String> {
        let Some(probe_args) = &self.spec.probe_args else {
            return Ok(());
        };

        match process::run(&mut self.spec.command(probe_args), self.spec.timeout()) {
            Ok(output) if output.status.success() => {
                tracing::debug!("{} is available", self.spec.program);
                Ok(())
            }
            Ok(output) => Err(format!("{} probe exited with {}", self.spec.program, output.status)),
            Err(ProcessError::Spawn(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(format!("{} not found in PATH", self.spec.program))
            }
            Err(e) => Err(format!("{} probe failed: {}", self.spec.program, describe(&e))),
        }
    }

    fn args_for(&self, file: &CandidateFile) -> Vec<String> {
        let path = file.path.to_string_lossy();
        self.spec.args.iter().map(|arg| arg.replace(FILE_PLACEHOLDER, &path)).collect()
    }

    fn violation_reason(&self) -> String {
        match self.spec.mode {
            ToolMode::CompareStdout => format!("formatting differs from {} output", self.spec.program),
            ToolMode::ExitStatus => format!("{} reported formatting changes", self.spec.program),
        }
    }
}

impl Policy for ExternalToolPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn readiness(&self) -> Result<(), String> {
        self.check_available()
    }

    fn evaluate(&self, file: &CandidateFile) -> Outcome {
        if let Err(detail) = self.check_available() {
            return Outcome::evaluation_error(EvaluationErrorKind::ToolUnavailable, detail);
        }

        let output = match process::run(&mut self.spec.command(&self.args_for(file)), self.spec.timeout()) {
            Ok(output) => output,
            Err(ProcessError::Spawn(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Outcome::evaluation_error(
                    EvaluationErrorKind::ToolUnavailable,
                    format!("{} not found in PATH", self.spec.program),
                );
            }
            Err(ProcessError::TimedOut(limit)) => {
                tracing::warn!("{} timed out after {:?} on {}", self.spec.program, limit, file);
                return Outcome::evaluation_error(
                    EvaluationErrorKind::TimedOut,
                    format!("{} exceeded {:?}", self.spec.program, limit),
                );
            }
            Err(e) => {
                return Outcome::evaluation_error(EvaluationErrorKind::ToolFailed, describe(&e));
            }
        };

        let exit_detail = || {
            let mut detail = format!("{} exited with {}", self.spec.program, output.status);
            if let Some(stderr) = output.stderr_summary() {
                detail.push_str(": ");
                detail.push_str(&stderr);
            }
            detail
        };

        match self.spec.mode {
            ToolMode::CompareStdout => {
                if !output.status.success() {
                    tracing::warn!("{} failed on {}", self.spec.program, file);
                    return Outcome::evaluation_error(EvaluationErrorKind::ToolFailed, exit_detail());
                }
                match fs::read(&file.path) {
                    Ok(current) if current == output.stdout => Outcome::Compliant,
                    Ok(_) => Outcome::non_compliant(self.violation_reason()),
                    Err(e) => Outcome::evaluation_error(EvaluationErrorKind::Io, e.to_string()),
                }
            }
            ToolMode::ExitStatus => match output.status.code() {
                Some(0) => Outcome::Compliant,
                Some(code) if self.spec.violation_exit_codes.contains(&code) => {
                    Outcome::non_compliant(self.violation_reason())
                }
                _ => Outcome::evaluation_error(EvaluationErrorKind::ToolFailed, exit_detail()),
            },
        }
    }
}

fn describe(error: &ProcessError) -> String {
    match error {
        ProcessError::Spawn(e) => format!("failed to start: {e}"),
        ProcessError::Wait(e) => format!("failed while waiting: {e}"),
        ProcessError::TimedOut(limit) => format!("timed out after {limit:?}"),
    }
}
