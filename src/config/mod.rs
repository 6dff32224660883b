//! Configuration loading and management for Compliance Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are converted to policy families the scanner can run
//! - Target extensions and default directories are per-family values, not globals
//! - Built-in presets cover asset naming and C/C++ and C# formatting

use crate::domain::outcome::{ComplianceError, ComplianceResult};
use crate::policy::{NamingPolicy, NamingRule, ToolMode, ToolSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File names searched for in the working directory when no config is given
pub const DEFAULT_CONFIG_FILES: &[&str] =
    &["compliance_guardian.yaml", "compliance_guardian.yml", ".compliance_guardian.yaml"];

/// Main configuration structure for Compliance Guardian
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Configuration format version
    pub version: String,
    /// Policy families by name
    pub policies: BTreeMap<String, PolicyConfig>,
}

/// A named policy family: what to look at and how to judge it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// One-line description shown by `policies`
    #[serde(default)]
    pub description: String,
    /// File extensions the family targets (case-insensitive)
    pub extensions: Vec<String>,
    /// Search roots used when no include directories are given, relative to the root
    #[serde(default = "default_includes")]
    pub default_includes: Vec<String>,
    /// Directory name patterns pruned anywhere below a search root
    #[serde(default)]
    pub skip_dirs: Vec<String>,
    /// Console messages for this family
    #[serde(default)]
    pub messages: PolicyMessages,
    /// How each file is judged
    pub check: CheckConfig,
}

/// Per-file check performed by a policy family
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CheckConfig {
    /// File stems must match a rule from a rules table
    Naming {
        /// CSV rules table, relative to the project root unless absolute
        #[serde(default)]
        rules_file: Option<PathBuf>,
        /// Inline rules, used in addition to the table
        #[serde(default)]
        rules: Vec<NamingRule>,
    },
    /// An external tool judges each file
    External { tool: ToolSpec },
}

impl CheckConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Naming { .. } => "naming",
            Self::External { .. } => "external",
        }
    }
}

/// Console messages for a policy family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMessages {
    /// Printed when no issues are found
    pub pass: String,
    /// Headline printed above the issue list
    pub failure: String,
    /// Printed when discovery found nothing to check; falls back to `pass`
    #[serde(default)]
    pub empty: Option<String>,
    /// Headline used when the backing tool could not be found
    #[serde(default)]
    pub unavailable: Option<String>,
    /// Hint printed after the issue list
    #[serde(default)]
    pub remedy: Option<String>,
}

impl Default for PolicyMessages {
    fn default() -> Self {
        Self {
            pass: "No compliance issues found.".to_string(),
            failure: "Compliance issues found:".to_string(),
            empty: None,
            unavailable: None,
            remedy: None,
        }
    }
}

impl PolicyMessages {
    pub fn empty_message(&self) -> &str {
        self.empty.as_deref().unwrap_or(&self.pass)
    }
}

impl ScanConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ComplianceResult<Self> {
        let contents = fs::read_to_string(&path).map_err(|e| {
            ComplianceError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            ComplianceError::config(format!(
                "Failed to parse config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> ComplianceResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ComplianceError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Load the first default config file present in `dir`, or the built-in presets
    pub fn discover_in<P: AsRef<Path>>(dir: P) -> ComplianceResult<Self> {
        for name in DEFAULT_CONFIG_FILES {
            let candidate = dir.as_ref().join(name);
            if candidate.is_file() {
                tracing::debug!("Using configuration {}", candidate.display());
                return Self::load_from_file(candidate);
            }
        }
        Ok(Self::with_defaults())
    }

    /// Get default configuration with the built-in policy families
    pub fn with_defaults() -> Self {
        let mut policies = BTreeMap::new();

        policies.insert(
            "asset-names".to_string(),
            PolicyConfig {
                description: "Asset file names must match a naming rule".to_string(),
                extensions: strings(&[".uasset", ".umap", ".png", ".wav"]),
                default_includes: strings(&["Content", "."]),
                skip_dirs: Vec::new(),
                messages: PolicyMessages {
                    pass: "No asset naming issues found.".to_string(),
                    failure: "Asset naming issues found:".to_string(),
                    empty: None,
                    unavailable: None,
                    remedy: None,
                },
                check: CheckConfig::Naming { rules_file: None, rules: Vec::new() },
            },
        );

        policies.insert(
            "cc-format".to_string(),
            PolicyConfig {
                description: "C/C++ sources must match clang-format output".to_string(),
                extensions: strings(&[".cpp", ".cc", ".c", ".h", ".hpp", ".inl"]),
                default_includes: default_includes(),
                skip_dirs: strings(&["node_modules", ".git"]),
                messages: PolicyMessages {
                    pass: "C/C++ files formatted correctly.".to_string(),
                    failure: "C/C++ formatting issues detected (use clang-format -i).".to_string(),
                    empty: Some("No C/C++ source files found.".to_string()),
                    unavailable: Some(
                        "clang-format not found in PATH. Cannot run C/C++ formatting check."
                            .to_string(),
                    ),
                    remedy: None,
                },
                check: CheckConfig::External {
                    tool: ToolSpec::new(
                        "clang-format",
                        strings(&["-style=file", "{file}"]),
                        ToolMode::CompareStdout,
                    )
                    .with_probe(strings(&["--version"])),
                },
            },
        );

        policies.insert(
            "cs-format".to_string(),
            PolicyConfig {
                description: "C# sources must pass dotnet format whitespace verification"
                    .to_string(),
                extensions: strings(&[".cs"]),
                default_includes: default_includes(),
                skip_dirs: Vec::new(),
                messages: PolicyMessages {
                    pass: "C# files formatted correctly.".to_string(),
                    failure: "C# formatting issues detected.".to_string(),
                    empty: None,
                    unavailable: Some(
                        "dotnet not available in PATH. Cannot run C# formatting checks."
                            .to_string(),
                    ),
                    remedy: Some(
                        "Run `dotnet format whitespace --folder --include <file>` or `dotnet format` on the project."
                            .to_string(),
                    ),
                },
                check: CheckConfig::External {
                    tool: ToolSpec::new(
                        "dotnet",
                        strings(&[
                            "format",
                            "whitespace",
                            "--verify-no-changes",
                            "--folder",
                            "--include",
                            "{file}",
                        ]),
                        ToolMode::ExitStatus,
                    )
                    .with_violation_exit_codes(vec![2])
                    .with_probe(strings(&["--version"])),
                },
            },
        );

        Self { version: "1.0".to_string(), policies }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> ComplianceResult<()> {
        if !["1.0"].contains(&self.version.as_str()) {
            return Err(ComplianceError::config(format!(
                "Unsupported configuration version: {}. Supported versions: 1.0",
                self.version
            )));
        }

        if self.policies.is_empty() {
            return Err(ComplianceError::config("Configuration defines no policies"));
        }

        for (name, policy) in &self.policies {
            let in_policy =
                |message: String| ComplianceError::config(format!("Policy '{name}': {message}"));

            if policy.extensions.iter().all(|ext| ext.trim().trim_start_matches('.').is_empty()) {
                return Err(in_policy("at least one target extension is required".to_string()));
            }

            if policy.default_includes.is_empty() {
                return Err(in_policy("default_includes must not be empty".to_string()));
            }

            for pattern in &policy.skip_dirs {
                glob::Pattern::new(pattern)
                    .map_err(|e| in_policy(format!("invalid skip_dirs pattern '{pattern}': {e}")))?;
            }

            match &policy.check {
                CheckConfig::Naming { rules, .. } => {
                    NamingPolicy::new(name.clone(), rules.clone())
                        .map_err(|e| in_policy(e.to_string()))?;
                }
                CheckConfig::External { tool } => {
                    tool.validate().map_err(|e| in_policy(e.to_string()))?;
                }
            }
        }

        Ok(())
    }

    /// Look up a policy family by name
    pub fn policy(&self, name: &str) -> ComplianceResult<&PolicyConfig> {
        self.policies.get(name).ok_or_else(|| {
            ComplianceError::config(format!(
                "Unknown policy '{}'. Available policies: {}",
                name,
                self.policies.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> ComplianceResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ComplianceError::config(format!("Failed to serialize config: {e}")))
    }

    /// Create a stable fingerprint of the configuration
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        // BTreeMap iteration is sorted, so the serialized form is stable.
        self.version.hash(&mut hasher);
        for (name, policy) in &self.policies {
            name.hash(&mut hasher);
            policy.extensions.hash(&mut hasher);
            policy.default_includes.hash(&mut hasher);
            policy.skip_dirs.hash(&mut hasher);
            match &policy.check {
                CheckConfig::Naming { rules_file, rules } => {
                    rules_file.hash(&mut hasher);
                    rules.hash(&mut hasher);
                }
                CheckConfig::External { tool } => tool.hash(&mut hasher),
            }
        }

        format!("{:x}", hasher.finish())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_includes() -> Vec<String> {
    vec![".".to_string()]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: ScanConfig,
}

impl ConfigBuilder {
    /// Create a new builder with the built-in policy families
    pub fn new() -> Self {
        Self { config: ScanConfig::default() }
    }

    /// Create a builder with no policy families
    pub fn empty() -> Self {
        Self { config: ScanConfig { version: "1.0".to_string(), policies: BTreeMap::new() } }
    }

    /// Add or replace a policy family
    pub fn add_policy(mut self, name: impl Into<String>, policy: PolicyConfig) -> Self {
        self.config.policies.insert(name.into(), policy);
        self
    }

    /// Point a naming family at a rules table
    pub fn rules_file(mut self, policy: &str, path: impl Into<PathBuf>) -> Self {
        if let Some(PolicyConfig { check: CheckConfig::Naming { rules_file, .. }, .. }) =
            self.config.policies.get_mut(policy)
        {
            *rules_file = Some(path.into());
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ComplianceResult<ScanConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScanConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.policies.keys().collect::<Vec<_>>(),
            vec!["asset-names", "cc-format", "cs-format"]
        );
        assert_eq!(config.policy("asset-names").unwrap().default_includes, vec!["Content", "."]);
    }

    #[test]
    fn test_unknown_policy_lists_available() {
        let err = ScanConfig::default().policy("py-format").unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("asset-names, cc-format, cs-format"));
    }

    #[test]
    fn test_load_from_str() {
        let yaml = r#"
version: "1.0"
policies:
  texture-names:
    extensions: [png, tga]
    check:
      kind: naming
      rules:
        - name: Texture
          prefix: T_
  rs-format:
    extensions: [".rs"]
    skip_dirs: [target]
    messages:
      pass: "Rust files formatted correctly."
      failure: "Rust formatting issues detected."
    check:
      kind: external
      tool:
        program: rustfmt
        args: ["--check", "{file}"]
        mode: exit-status
        violation_exit_codes: [1]
        timeout_ms: 30000
"#;

        let config = ScanConfig::load_from_str(yaml).unwrap();
        let texture = config.policy("texture-names").unwrap();
        assert_eq!(texture.default_includes, vec!["."]);
        assert_eq!(texture.messages, PolicyMessages::default());
        assert_eq!(texture.check.kind(), "naming");

        let rs = config.policy("rs-format").unwrap();
        match &rs.check {
            CheckConfig::External { tool } => {
                assert_eq!(tool.mode, ToolMode::ExitStatus);
                assert_eq!(tool.timeout(), Some(std::time::Duration::from_secs(30)));
            }
            other => panic!("unexpected check {other:?}"),
        }
        assert_eq!(rs.messages.empty_message(), "Rust files formatted correctly.");
    }

    #[test]
    fn test_validation_failures() {
        let bad_version = "version: \"2.0\"\npolicies: {}\n";
        assert!(ScanConfig::load_from_str(bad_version).is_err());

        let no_extensions = r#"
version: "1.0"
policies:
  broken:
    extensions: []
    check: { kind: naming }
"#;
        assert!(ScanConfig::load_from_str(no_extensions).unwrap_err().to_string().contains("broken"));

        let bad_glob = r#"
version: "1.0"
policies:
  broken:
    extensions: [png]
    skip_dirs: ["[oops"]
    check: { kind: naming }
"#;
        assert!(ScanConfig::load_from_str(bad_glob).is_err());

        let no_placeholder = r#"
version: "1.0"
policies:
  broken:
    extensions: [cc]
    check:
      kind: external
      tool: { program: clang-format, args: ["-style=file"], mode: compare-stdout }
"#;
        assert!(ScanConfig::load_from_str(no_placeholder).is_err());
    }

    #[test]
    fn test_load_from_file_and_discovery() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".compliance_guardian.yaml");

        // No file yet: built-in presets.
        let defaults = ScanConfig::discover_in(temp_dir.path()).unwrap();
        assert_eq!(defaults.policies.len(), 3);

        let custom = ConfigBuilder::empty()
            .add_policy("cs-format", ScanConfig::default().policy("cs-format").unwrap().clone())
            .build()
            .unwrap();
        fs::write(&config_path, serde_yaml::to_string(&custom).unwrap()).unwrap();

        let discovered = ScanConfig::discover_in(temp_dir.path()).unwrap();
        assert_eq!(discovered.policies.len(), 1);
        assert_eq!(discovered.fingerprint(), custom.fingerprint());

        assert!(ScanConfig::load_from_file(temp_dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_builder_sets_rules_file() {
        let config = ConfigBuilder::new().rules_file("asset-names", "Config/AssetNames.csv").build().unwrap();

        match &config.policy("asset-names").unwrap().check {
            CheckConfig::Naming { rules_file, .. } => {
                assert_eq!(rules_file.as_deref(), Some(Path::new("Config/AssetNames.csv")));
            }
            other => panic!("unexpected check {other:?}"),
        }
        assert_ne!(config.fingerprint(), ScanConfig::default().fingerprint());
    }

    #[test]
    fn test_fingerprint_is_stable_and_json_serializes() {
        let config = ScanConfig::default();

        assert_eq!(config.fingerprint(), ScanConfig::default().fingerprint());
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["policies"]["cc-format"]["check"]["kind"], "external");
        assert_eq!(json["policies"]["cc-format"]["check"]["tool"]["mode"], "compare-stdout");
    }
}
