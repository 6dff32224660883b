//! Compliance Guardian - scoped project-compliance scanning
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - PathScope and FileDiscovery decide which files a policy sees
//! - PolicyEvaluator applies one opaque policy per file
//! - ScanReport aggregates non-compliant outcomes into a verdict

pub mod config;
pub mod discovery;
pub mod domain;
pub mod evaluator;
pub mod policy;
pub mod report;
pub mod scope;

// Re-export main types for convenient access
pub use domain::outcome::{
    CandidateFile, ComplianceError, ComplianceResult, DiscoveryWarning, Evaluation,
    EvaluationErrorKind, Outcome,
};
pub use domain::report::{ScanReport, ScanSummary, Verdict, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE};

pub use config::{CheckConfig, ConfigBuilder, PolicyConfig, PolicyMessages, ScanConfig};

pub use discovery::{CandidateSelector, Discovery, ExtensionSelector, FileDiscovery};

pub use evaluator::{EvaluationOptions, PolicyEvaluator};

pub use policy::{ExternalToolPolicy, NamingPolicy, NamingRule, Policy, PredicatePolicy, ToolMode, ToolSpec};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use scope::{ExclusionBoundary, PathScope, ResolvedScope};

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Options for building a scanner from a policy family
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Rules table overriding the family's configured one
    pub rules_file: Option<PathBuf>,
    /// Per-invocation timeout overriding the family's configured one
    pub timeout: Option<Duration>,
    /// Evaluation options
    pub evaluation: EvaluationOptions,
}

/// Runs one policy over one project root
pub struct ComplianceScanner {
    scope: PathScope,
    discovery: FileDiscovery,
    selector: Box<dyn CandidateSelector>,
    policy: Box<dyn Policy>,
    evaluator: PolicyEvaluator,
    messages: PolicyMessages,
    config_fingerprint: Option<String>,
}

impl ComplianceScanner {
    /// Build a scanner for a configured policy family
    pub fn for_policy<P: AsRef<Path>>(
        config: &ScanConfig,
        policy_name: &str,
        root: P,
        options: ScanOptions,
    ) -> ComplianceResult<Self> {
        let family = config.policy(policy_name)?;
        let scope = PathScope::new(root)?.with_default_includes(family.default_includes.clone());
        let policy = build_policy(policy_name, family, scope.root(), &options)?;

        Ok(Self {
            discovery: FileDiscovery::new().with_skip_dirs(&family.skip_dirs)?,
            selector: Box::new(ExtensionSelector::new(&family.extensions)),
            policy,
            evaluator: PolicyEvaluator::new(options.evaluation),
            messages: family.messages.clone(),
            config_fingerprint: Some(config.fingerprint()),
            scope,
        })
    }

    /// Build a scanner around a caller-supplied selector and policy
    pub fn with_policy(
        scope: PathScope,
        selector: Box<dyn CandidateSelector>,
        policy: Box<dyn Policy>,
    ) -> Self {
        Self {
            scope,
            discovery: FileDiscovery::new(),
            selector,
            policy,
            evaluator: PolicyEvaluator::default(),
            messages: PolicyMessages::default(),
            config_fingerprint: None,
        }
    }

    /// Replace the evaluator options
    pub fn with_evaluation_options(mut self, options: EvaluationOptions) -> Self {
        self.evaluator = PolicyEvaluator::new(options);
        self
    }

    /// Replace the discovery settings
    pub fn with_discovery(mut self, discovery: FileDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn root(&self) -> &Path {
        self.scope.root()
    }

    pub fn policy_id(&self) -> &str {
        self.policy.id()
    }

    pub fn messages(&self) -> &PolicyMessages {
        &self.messages
    }

    /// Resolve scope and discover candidates without evaluating them
    pub fn discover(&self, include_dirs: &[String], exclude_dirs: &[String]) -> Discovery {
        let resolved = self.scope.resolve(include_dirs, exclude_dirs);
        self.discovery.discover(&resolved, self.selector.as_ref())
    }

    /// Discover, evaluate and aggregate in one pass
    pub fn scan(&self, include_dirs: &[String], exclude_dirs: &[String]) -> ComplianceResult<ScanReport> {
        let start_time = Instant::now();

        let readiness = self.policy.readiness();
        if let Err(detail) = &readiness {
            tracing::warn!("Policy {} cannot run: {}", self.policy.id(), detail);
        }

        let discovery = self.discover(include_dirs, exclude_dirs);
        tracing::debug!(
            policy = self.policy.id(),
            candidates = discovery.len(),
            "evaluating candidates"
        );

        let evaluations = self.evaluator.evaluate(&discovery.candidates, self.policy.as_ref())?;

        let mut report = ScanReport::aggregate(self.policy.id(), evaluations);
        if let Err(detail) = readiness {
            report.mark_unavailable(detail);
        }
        report.set_warnings(discovery.warnings);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        if let Some(fingerprint) = &self.config_fingerprint {
            report.set_config_fingerprint(fingerprint.clone());
        }

        Ok(report)
    }

    /// Report formatter preloaded with this scanner's messages
    pub fn report_formatter(&self, use_colors: bool, relative_paths: bool) -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            use_colors,
            relative_to: relative_paths.then(|| self.root().to_path_buf()),
            messages: self.messages.clone(),
            ..Default::default()
        })
    }
}

/// Instantiate the policy a family describes, resolving paths against `root`
fn build_policy(
    name: &str,
    family: &PolicyConfig,
    root: &Path,
    options: &ScanOptions,
) -> ComplianceResult<Box<dyn Policy>> {
    match &family.check {
        CheckConfig::Naming { rules_file, rules } => {
            let mut all_rules = rules.clone();

            let table = options.rules_file.clone().or_else(|| rules_file.as_ref().map(|file| root.join(file)));
            if let Some(table) = table {
                if !table.is_file() {
                    return Err(ComplianceError::rules(
                        table.display().to_string(),
                        "Rules table not found",
                    ));
                }
                all_rules.extend(policy::naming::load_rules_csv(&table)?);
            }

            if all_rules.is_empty() {
                return Err(ComplianceError::config(format!(
                    "Policy '{name}' needs naming rules: pass a rules table or configure rules"
                )));
            }

            Ok(Box::new(NamingPolicy::new(name, all_rules)?))
        }
        CheckConfig::External { tool } => {
            let mut spec = tool.clone();
            spec.working_dir = Some(match &spec.working_dir {
                Some(dir) => root.join(dir),
                None => root.to_path_buf(),
            });
            if let Some(timeout) = options.timeout {
                spec = spec.with_timeout(timeout);
            }
            Ok(Box::new(ExternalToolPolicy::new(name, spec)?))
        }
    }
}

/// Convenience function to scan a root with a built-in policy family
pub fn scan_with_defaults<P: AsRef<Path>>(
    policy_name: &str,
    root: P,
    options: ScanOptions,
) -> ComplianceResult<ScanReport> {
    let scanner = ComplianceScanner::for_policy(&ScanConfig::default(), policy_name, root, options)?;
    scanner.scan(&[], &[])
}
