//! Report generation with multiple output formats
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ScanReport (domain) is converted to console, JSON, JUnit and GitHub representations
//! - Entries are always rendered in discovery order
//! - Violations and evaluation errors are labelled differently in every format

use crate::config::PolicyMessages;
use crate::domain::outcome::{ComplianceError, ComplianceResult, Evaluation, Outcome};
use crate::domain::report::ScanReport;
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Supported output formats for scan reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable console format
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI/CD integration
    Junit,
    /// GitHub Actions workflow annotations
    GitHub,
}

impl OutputFormat {
    /// Parse format from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "junit" => Some(Self::Junit),
            "github" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json", "junit", "github"]
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use ANSI colors (human format)
    pub use_colors: bool,
    /// Show paths relative to this directory when possible
    pub relative_to: Option<PathBuf>,
    /// Whether to list discovery warnings
    pub show_warnings: bool,
    /// Policy family messages
    pub messages: PolicyMessages,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            relative_to: None,
            show_warnings: true,
            messages: PolicyMessages::default(),
        }
    }
}

/// Renders scan reports in the supported formats
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Format a scan report in the specified format
    pub fn format_report(&self, report: &ScanReport, format: OutputFormat) -> ComplianceResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
            OutputFormat::Junit => Ok(self.format_junit(report)),
            OutputFormat::GitHub => Ok(self.format_github(report)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ScanReport,
        format: OutputFormat,
        mut writer: W,
    ) -> ComplianceResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn root(&self) -> Option<&Path> {
        self.options.relative_to.as_deref()
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.options.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Format report in human-readable format
    fn format_human(&self, report: &ScanReport) -> String {
        let messages = &self.options.messages;
        let mut output = String::new();

        if report.verdict.is_pass() && report.nothing_to_check() {
            output.push_str(&format!("✅ {}\n", self.paint(messages.empty_message(), "32")));
        } else if report.verdict.is_pass() {
            output.push_str(&format!("✅ {}\n", self.paint(&messages.pass, "32")));
        } else {
            let headline = if report.tool_unavailable() {
                messages.unavailable.clone().unwrap_or_else(|| {
                    "Required tool unavailable; no file could be checked:".to_string()
                })
            } else {
                messages.failure.clone()
            };
            output.push_str(&format!("❌ {}\n", self.paint(&headline, "31")));

            if report.entries.is_empty() {
                if let Some(detail) = &report.summary.unavailable {
                    output.push_str(&format!(" - {detail}\n"));
                }
            }

            for entry in &report.entries {
                output.push_str(&self.format_entry(entry));
            }

            if report.has_violations() {
                if let Some(remedy) = &messages.remedy {
                    output.push_str(&format!("💡 {}\n", self.paint(remedy, "32")));
                }
            }
        }

        if self.options.show_warnings && !report.summary.warnings.is_empty() {
            output.push_str(&format!(
                "⚠️  {}\n",
                self.paint(&format!("Skipped {} path(s) during discovery", report.summary.warnings.len()), "33")
            ));
            for warning in &report.summary.warnings {
                output.push_str(&format!(
                    "    {}: {}\n",
                    display_path(&warning.path, self.root()),
                    warning.message
                ));
            }
        }

        output.push_str(&self.format_summary(report));
        output
    }

    fn format_entry(&self, entry: &Evaluation) -> String {
        let path = entry.file.display_path(self.root());
        match &entry.outcome {
            Outcome::NonCompliant { reason: Some(reason) } => format!(" - {path} ({reason})\n"),
            Outcome::NonCompliant { reason: None } => format!(" - {path}\n"),
            Outcome::EvaluationError { kind, detail } => {
                let tag = self.paint(&format!("[error: {}]", kind.as_str()), "35");
                if detail.is_empty() {
                    format!(" - {path} {tag}\n")
                } else {
                    format!(" - {path} {tag} {detail}\n")
                }
            }
            Outcome::Compliant => String::new(),
        }
    }

    /// Format the summary section
    fn format_summary(&self, report: &ScanReport) -> String {
        let summary = &report.summary;
        let execution_time = (summary.execution_time_ms as f64) / 1000.0;

        let mut parts = Vec::new();
        let violations = format!(
            "{} violation{}",
            summary.non_compliant,
            if summary.non_compliant == 1 { "" } else { "s" }
        );
        parts.push(if summary.non_compliant > 0 { self.paint(&violations, "31") } else { violations });

        if summary.evaluation_errors > 0 {
            let errors = format!(
                "{} evaluation error{}",
                summary.evaluation_errors,
                if summary.evaluation_errors == 1 { "" } else { "s" }
            );
            parts.push(self.paint(&errors, "35"));
        }

        format!(
            "📊 {} {} in {} file{} ({:.1}s)\n",
            self.paint("Summary:", "1"),
            parts.join(", "),
            summary.candidates,
            if summary.candidates == 1 { "" } else { "s" },
            execution_time
        )
    }

    /// Format report in JSON format
    fn format_json(&self, report: &ScanReport) -> ComplianceResult<String> {
        let entries: Vec<JsonValue> = report
            .entries
            .iter()
            .map(|entry| {
                let mut value = serde_json::json!({
                    "path": entry.file.display_path(self.root()),
                    "status": entry.outcome.label(),
                });
                match &entry.outcome {
                    Outcome::NonCompliant { reason } => {
                        value["reason"] = serde_json::json!(reason);
                    }
                    Outcome::EvaluationError { kind, detail } => {
                        value["error_kind"] = serde_json::json!(kind);
                        value["detail"] = serde_json::json!(detail);
                    }
                    Outcome::Compliant => {}
                }
                value
            })
            .collect();

        let summary = &report.summary;
        let json_report = serde_json::json!({
            "policy": summary.policy,
            "verdict": report.verdict.as_str(),
            "entries": entries,
            "summary": {
                "candidates": summary.candidates,
                "compliant": summary.compliant,
                "non_compliant": summary.non_compliant,
                "evaluation_errors": summary.evaluation_errors,
                "tool_unavailable": summary.tool_unavailable,
                "unavailable": summary.unavailable,
                "nothing_to_check": report.nothing_to_check(),
                "warnings": summary.warnings.iter().map(|w| serde_json::json!({
                    "path": display_path(&w.path, self.root()),
                    "message": w.message,
                })).collect::<Vec<_>>(),
                "execution_time_ms": summary.execution_time_ms,
                "scanned_at": summary.scanned_at.to_rfc3339(),
            },
            "config_fingerprint": report.config_fingerprint,
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| ComplianceError::report(format!("JSON serialization failed: {e}")))
    }

    /// Format report in JUnit XML format
    fn format_junit(&self, report: &ScanReport) -> String {
        let summary = &report.summary;
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
            escape_xml(&summary.policy),
            summary.candidates,
            summary.non_compliant,
            summary.evaluation_errors,
            (summary.execution_time_ms as f64) / 1000.0
        ));

        for entry in &report.entries {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n",
                escape_xml(&summary.policy),
                escape_xml(&entry.file.display_path(self.root()))
            ));
            let detail = entry.outcome.detail().unwrap_or_default();
            match &entry.outcome {
                Outcome::EvaluationError { kind, .. } => xml.push_str(&format!(
                    "    <error type=\"{}\" message=\"{}\"/>\n",
                    escape_xml(kind.as_str()),
                    escape_xml(&detail)
                )),
                _ => xml.push_str(&format!("    <failure message=\"{}\"/>\n", escape_xml(&detail))),
            }
            xml.push_str("  </testcase>\n");
        }

        if let (true, Some(detail)) = (report.entries.is_empty(), &summary.unavailable) {
            xml.push_str(&format!(
                "  <testcase classname=\"{0}\" name=\"{0}\">\n    <error type=\"tool unavailable\" message=\"{1}\"/>\n  </testcase>\n",
                escape_xml(&summary.policy),
                escape_xml(detail)
            ));
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Format report for GitHub Actions
    fn format_github(&self, report: &ScanReport) -> String {
        let mut output = String::new();

        if let (true, Some(detail)) = (report.entries.is_empty(), &report.summary.unavailable) {
            output.push_str(&format!("::error title={}::{}\n", report.summary.policy, detail));
        }

        for entry in &report.entries {
            let (level, title) = match &entry.outcome {
                Outcome::EvaluationError { kind, .. } => ("warning", format!("{} ({})", report.summary.policy, kind.as_str())),
                _ => ("error", report.summary.policy.clone()),
            };
            let message = entry
                .outcome
                .detail()
                .unwrap_or_else(|| self.options.messages.failure.clone());

            output.push_str(&format!(
                "::{} file={},title={}::{}\n",
                level,
                entry.file.display_path(self.root()),
                title,
                message
            ));
        }

        output
    }
}

fn display_path(path: &Path, root: Option<&Path>) -> String {
    root.and_then(|root| path.strip_prefix(root).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::domain::outcome::{CandidateFile, DiscoveryWarning, EvaluationErrorKind};

    fn asset_messages() -> PolicyMessages {
        ScanConfig::default().policy("asset-names").unwrap().messages.clone()
    }

    fn plain(messages: PolicyMessages) -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            use_colors: false,
            relative_to: Some(PathBuf::from("/project")),
            messages,
            ..Default::default()
        })
    }

    fn create_test_report() -> ScanReport {
        let mut report = ScanReport::aggregate(
            "asset-names",
            vec![
                Evaluation::new(CandidateFile::new("/project/Content/SM_Rock.uasset"), Outcome::Compliant),
                Evaluation::new(
                    CandidateFile::new("/project/Content/rock.uasset"),
                    Outcome::non_compliant("\"rock\" does not match any naming rule"),
                ),
            ],
        );
        report.set_execution_time(1200);
        report
    }

    #[test]
    fn test_human_format() {
        let output = plain(asset_messages()).format_report(&create_test_report(), OutputFormat::Human).unwrap();

        assert!(output.contains("Asset naming issues found:"));
        assert!(output.contains(" - Content/rock.uasset (\"rock\" does not match any naming rule)"));
        assert!(!output.contains("SM_Rock"));
        assert!(output.contains("Summary: 1 violation in 2 files (1.2s)"));
    }

    #[test]
    fn test_human_format_pass_and_empty() {
        let cc_messages = ScanConfig::default().policy("cc-format").unwrap().messages.clone();
        let formatter = plain(cc_messages);

        let empty = ScanReport::aggregate("cc-format", Vec::new());
        let output = formatter.format_report(&empty, OutputFormat::Human).unwrap();
        assert!(output.contains("No C/C++ source files found."));

        let clean = ScanReport::aggregate(
            "cc-format",
            vec![Evaluation::new(CandidateFile::new("/project/a.cc"), Outcome::Compliant)],
        );
        let output = formatter.format_report(&clean, OutputFormat::Human).unwrap();
        assert!(output.contains("C/C++ files formatted correctly."));
    }

    #[test]
    fn test_human_format_distinguishes_tool_unavailable() {
        let cc_messages = ScanConfig::default().policy("cc-format").unwrap().messages.clone();
        let report = ScanReport::aggregate(
            "cc-format",
            vec![Evaluation::new(
                CandidateFile::new("/project/src/a.cc"),
                Outcome::evaluation_error(EvaluationErrorKind::ToolUnavailable, "clang-format not found in PATH"),
            )],
        );

        let output = plain(cc_messages).format_report(&report, OutputFormat::Human).unwrap();

        assert!(output.contains("clang-format not found in PATH. Cannot run C/C++ formatting check."));
        assert!(output.contains(" - src/a.cc [error: tool unavailable] clang-format not found in PATH"));
        assert!(!output.contains("formatting issues detected"));
        assert!(output.contains("1 evaluation error"));
    }

    #[test]
    fn test_unavailable_tool_with_nothing_to_check_is_a_failure() {
        let cc_messages = ScanConfig::default().policy("cc-format").unwrap().messages.clone();
        let mut report = ScanReport::aggregate("cc-format", Vec::new());
        report.mark_unavailable("clang-format not found in PATH");
        let formatter = plain(cc_messages);

        let human = formatter.format_report(&report, OutputFormat::Human).unwrap();
        assert!(human.starts_with("❌ clang-format not found in PATH. Cannot run C/C++ formatting check."));
        assert!(!human.contains("No C/C++ source files found."));

        let json: JsonValue =
            serde_json::from_str(&formatter.format_report(&report, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["verdict"], "fail");
        assert_eq!(json["summary"]["unavailable"], "clang-format not found in PATH");

        let github = formatter.format_report(&report, OutputFormat::GitHub).unwrap();
        assert_eq!(github, "::error title=cc-format::clang-format not found in PATH\n");

        let junit = formatter.format_report(&report, OutputFormat::Junit).unwrap();
        assert!(junit.contains("<error type=\"tool unavailable\""));
    }

    #[test]
    fn test_human_format_lists_warnings() {
        let mut report = create_test_report();
        report.set_warnings(vec![DiscoveryWarning::new("/project/Locked", "permission denied")]);

        let output = plain(asset_messages()).format_report(&report, OutputFormat::Human).unwrap();

        assert!(output.contains("Skipped 1 path(s) during discovery"));
        assert!(output.contains("Locked: permission denied"));
    }

    #[test]
    fn test_json_format() {
        let mut report = create_test_report();
        report.set_config_fingerprint("abc123");
        let output = plain(asset_messages()).format_report(&report, OutputFormat::Json).unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["verdict"], "fail");
        assert_eq!(json["entries"].as_array().unwrap().len(), 1);
        assert_eq!(json["entries"][0]["path"], "Content/rock.uasset");
        assert_eq!(json["entries"][0]["status"], "non-compliant");
        assert_eq!(json["summary"]["candidates"], 2);
        assert_eq!(json["summary"]["nothing_to_check"], false);
        assert_eq!(json["config_fingerprint"], "abc123");
    }

    #[test]
    fn test_junit_format() {
        let report = ScanReport::aggregate(
            "cc-format",
            vec![
                Evaluation::new(CandidateFile::new("/project/a.cc"), Outcome::non_compliant("formatting differs")),
                Evaluation::new(
                    CandidateFile::new("/project/b.cc"),
                    Outcome::evaluation_error(EvaluationErrorKind::TimedOut, "clang-format exceeded 5s"),
                ),
            ],
        );
        let output = plain(PolicyMessages::default()).format_report(&report, OutputFormat::Junit).unwrap();

        assert!(output.contains("<?xml version=\"1.0\""));
        assert!(output.contains("tests=\"2\" failures=\"1\" errors=\"1\""));
        assert!(output.contains("<failure message=\"formatting differs\"/>"));
        assert!(output.contains("<error type=\"timed out\""));
    }

    #[test]
    fn test_github_format() {
        let output = plain(asset_messages()).format_report(&create_test_report(), OutputFormat::GitHub).unwrap();

        assert_eq!(
            output,
            "::error file=Content/rock.uasset,title=asset-names::\"rock\" does not match any naming rule\n"
        );
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("sarif"), None);
        assert_eq!(OutputFormat::all_formats().len(), 4);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &#39;b&#39;&gt;");
    }
}
