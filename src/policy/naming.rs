//! Asset naming-convention policy driven by a rules table
//!
//! A file complies when its stem satisfies at least one rule. Each rule may
//! constrain a prefix, a suffix and an optional regex; empty constraints match
//! anything.

use crate::domain::outcome::{CandidateFile, ComplianceError, ComplianceResult, Outcome};
use crate::policy::Policy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One row of the naming rules table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NamingRule {
    /// Asset class the rule describes (e.g. "Static Mesh")
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    /// Optional regex the whole name must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl NamingRule {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self { name: name.into(), prefix: prefix.into(), suffix: suffix.into(), pattern: None }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

#[derive(Debug)]
struct CompiledRule {
    rule: NamingRule,
    regex: Option<Regex>,
}

impl CompiledRule {
    fn matches(&self, name: &str) -> bool {
        if !self.rule.prefix.is_empty() && !name.starts_with(&self.rule.prefix) {
            return false;
        }
        if !self.rule.suffix.is_empty() && !name.ends_with(&self.rule.suffix) {
            return false;
        }
        self.regex.as_ref().map_or(true, |regex| regex.is_match(name))
    }
}

/// Checks file stems against a table of naming rules
#[derive(Debug)]
pub struct NamingPolicy {
    id: String,
    rules: Vec<CompiledRule>,
}

impl NamingPolicy {
    /// Compile a rule set; invalid regex patterns are configuration errors
    pub fn new(id: impl Into<String>, rules: Vec<NamingRule>) -> ComplianceResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = match rule.pattern.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                    ComplianceError::pattern(format!(
                        "Invalid pattern in naming rule '{}': {}",
                        rule.name, e
                    ))
                })?),
                None => None,
            };
            compiled.push(CompiledRule { rule, regex });
        }

        Ok(Self { id: id.into(), rules: compiled })
    }

    /// Load rules from a CSV table with a `Name,Prefix,Suffix[,Pattern]` header
    pub fn from_csv_file<P: AsRef<Path>>(id: impl Into<String>, path: P) -> ComplianceResult<Self> {
        Self::new(id, load_rules_csv(path)?)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// First rule the name satisfies, if any
    pub fn matching_rule(&self, name: &str) -> Option<&NamingRule> {
        self.rules.iter().find(|rule| rule.matches(name)).map(|compiled| &compiled.rule)
    }
}

impl Policy for NamingPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, file: &CandidateFile) -> Outcome {
        let name = file.display_name();
        match self.matching_rule(&name) {
            Some(rule) => {
                tracing::trace!("{} matches naming rule '{}'", name, rule.name);
                Outcome::Compliant
            }
            None => Outcome::non_compliant(format!("\"{name}\" does not match any naming rule")),
        }
    }
}

/// Read and parse a rules table from disk
pub fn load_rules_csv<P: AsRef<Path>>(path: P) -> ComplianceResult<Vec<NamingRule>> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let text = fs::read_to_string(path)
        .map_err(|e| ComplianceError::rules(source.clone(), format!("Failed to read rules table: {e}")))?;
    parse_rules_csv(&text, &source)
}

/// Parse a naming rules table.
///
/// The first non-blank line is the header; columns are looked up by name
/// (case-insensitive) so their order does not matter. Missing cells are empty.
pub fn parse_rules_csv(text: &str, source: &str) -> ComplianceResult<Vec<NamingRule>> {
    let mut lines = text.lines().map(|line| line.trim_end_matches('\r')).filter(|l| !l.trim().is_empty());

    let header: Vec<String> = lines
        .next()
        .ok_or_else(|| ComplianceError::rules(source, "Rules table is empty"))?
        .split(',')
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect();

    let column = |name: &str| header.iter().position(|h| h == name);
    let (name_col, prefix_col, suffix_col, pattern_col) =
        (column("name"), column("prefix"), column("suffix"), column("pattern"));

    if prefix_col.is_none() && suffix_col.is_none() && pattern_col.is_none() {
        return Err(ComplianceError::rules(
            source,
            "Header must contain at least one of Prefix, Suffix or Pattern",
        ));
    }

    let rules = lines
        .map(|line| {
            let cells: Vec<&str> = line.split(',').collect();
            let cell = |col: Option<usize>| {
                col.and_then(|i| cells.get(i)).map(|c| c.trim().to_string()).unwrap_or_default()
            };
            let pattern = cell(pattern_col);
            NamingRule {
                name: cell(name_col),
                prefix: cell(prefix_col),
                suffix: cell(suffix_col),
                pattern: if pattern.is_empty() { None } else { Some(pattern) },
            }
        })
        .collect();

    Ok(rules)
}
