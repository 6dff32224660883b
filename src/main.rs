//! Compliance Guardian CLI - Command-line interface for scoped compliance scans
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to scanner operations
//! - Handles external concerns like config discovery, process exit codes, and terminal output
//! - Configuration problems exit with 2, failed scans with 1

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use compliance_guardian::scope::parse_dir_list;
use compliance_guardian::{
    ComplianceError, ComplianceScanner, EvaluationOptions, OutputFormat, ScanConfig, ScanOptions,
    EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// Compliance Guardian - Scoped project compliance checks
#[derive(Parser)]
#[command(name = "compliance-guardian")]
#[command(version = "0.1.0")]
#[command(about = "Scoped compliance checks for asset naming and source formatting")]
#[command(long_about = "Compliance Guardian walks a project root, selects files by extension inside the requested directories, and judges each one with a policy family: asset naming rules, clang-format, or dotnet format.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one policy family over a project root
    Check(CheckArgs),

    /// List configured policy families
    Policies,

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Policy family to run (see `policies`)
    policy: String,

    /// Project root
    root: PathBuf,

    /// Comma-separated directories to search, relative to the root
    include_dirs: Option<String>,

    /// Comma-separated directories to exclude, relative to the root
    exclude_dirs: Option<String>,

    /// Additional comma-separated include directories
    #[arg(long, action = clap::ArgAction::Append)]
    include: Vec<String>,

    /// Additional comma-separated exclude directories
    #[arg(long, action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Naming rules table (CSV) overriding the configured one
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormatArg,

    /// Maximum number of concurrent evaluations
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable parallel processing
    #[arg(long)]
    no_parallel: bool,

    /// Per-file timeout for external tools, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print absolute paths instead of paths relative to the root
    #[arg(long)]
    absolute_paths: bool,
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Junit,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Junit => OutputFormat::Junit,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code_for(&e));
        }
    }
}

/// Configuration errors anywhere in the chain are usage errors
fn exit_code_for(error: &anyhow::Error) -> i32 {
    let configuration = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<ComplianceError>())
        .any(ComplianceError::is_configuration);

    if configuration {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    }
}

fn run_command(cli: Cli) -> Result<i32> {
    let use_colors = !cli.no_color;
    match cli.command {
        Commands::Check(args) => run_check(cli.config, args, use_colors),
        Commands::Policies => run_list_policies(cli.config),
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
    }
}

fn load_config(config_path: Option<PathBuf>) -> Result<ScanConfig> {
    match config_path {
        Some(path) => ScanConfig::load_from_file(&path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => ScanConfig::discover_in(".").context("loading configuration from the working directory"),
    }
}

/// Merge the positional list with any repeated flag values
fn collect_dirs(positional: Option<&str>, flags: &[String]) -> Vec<String> {
    positional
        .into_iter()
        .chain(flags.iter().map(String::as_str))
        .flat_map(parse_dir_list)
        .collect()
}

fn run_check(config_path: Option<PathBuf>, args: CheckArgs, use_colors: bool) -> Result<i32> {
    let config = load_config(config_path)?;

    let evaluation = if args.no_parallel {
        EvaluationOptions::sequential()
    } else {
        let mut options = EvaluationOptions::default();
        if let Some(jobs) = args.jobs {
            options.max_workers = jobs.max(1);
        }
        options
    };

    let options = ScanOptions {
        rules_file: args.rules.clone(),
        timeout: args.timeout_secs.map(Duration::from_secs),
        evaluation,
    };

    let scanner = ComplianceScanner::for_policy(&config, &args.policy, &args.root, options)
        .with_context(|| format!("preparing policy '{}'", args.policy))?;

    let include_dirs = collect_dirs(args.include_dirs.as_deref(), &args.include);
    let exclude_dirs = collect_dirs(args.exclude_dirs.as_deref(), &args.exclude);

    let report = scanner
        .scan(&include_dirs, &exclude_dirs)
        .with_context(|| format!("scanning {}", scanner.root().display()))?;

    let formatter = scanner.report_formatter(use_colors, !args.absolute_paths);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    formatter
        .write_report(&report, args.format.into(), &mut handle)
        .context("writing report")?;
    handle.flush().context("writing report")?;

    Ok(report.exit_code())
}

fn run_list_policies(config_path: Option<PathBuf>) -> Result<i32> {
    let config = load_config(config_path)?;

    println!("📋 Available Policies\n");

    for (name, policy) in &config.policies {
        println!("📂 {} ({})", name, policy.check.kind());
        if !policy.description.is_empty() {
            println!("   {}", policy.description);
        }
        println!("   Extensions: {}", policy.extensions.join(", "));
        println!("   Default directories: {}", policy.default_includes.join(", "));
        if !policy.skip_dirs.is_empty() {
            println!("   Skipped directories: {}", policy.skip_dirs.join(", "));
        }
        println!();
    }

    Ok(EXIT_SUCCESS)
}

fn run_validate_config(config_path: Option<PathBuf>) -> Result<i32> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from("compliance_guardian.yaml"));

    println!("Validating configuration: {}", config_path.display());

    match ScanConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("✅ Configuration is valid");

            let naming = config.policies.values().filter(|p| p.check.kind() == "naming").count();
            println!("📊 Configuration summary:");
            println!("  Policies: {} total, {} naming, {} external", config.policies.len(), naming, config.policies.len() - naming);
            println!("  Fingerprint: {}", config.fingerprint());

            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed: {e}");
            Ok(EXIT_USAGE)
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
