//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Equipment dataset generator, auditor, and rule-based scorer CLI."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pm_ems_common::{init_tracing, AppConfig, LogFormat, SimulatorConfig};
use pm_ems_config::{load_manifest_for, DatasetManifest};
use pm_ems_inference::{ErrorResponse, InferenceResponse, InferenceService};
use pm_ems_logging::{log_system_event, LogContext, SystemEventOutcome};
use pm_ems_sim::{audit, AuditReport, Dataset, DatasetFormat, DatasetGenerator, DatasetSummary};
use serde_json::Value;
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "pm-ems-simgen";
const DEFAULT_CONFIG_FILE: &str = "pm-ems.toml";
const STDIO: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl From<OutputFormat> for DatasetFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Csv => DatasetFormat::Csv,
            OutputFormat::Json => DatasetFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::StructuredJson,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate and check synthetic medical-equipment failure datasets",
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML). Falls back to $PM_EMS_CONFIG, then ./pm-ems.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Console log format; overrides the configuration file
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a labeled dataset
    Generate(GenerateArgs),
    /// Re-check the label invariants of an existing dataset
    Audit(AuditArgs),
    /// Score one feature row (JSON object or 10-value array) with the generator rules
    Predict(PredictArgs),
}

#[derive(Debug, Clone, Args)]
struct GenerateArgs {
    /// Number of records; overrides the configuration file
    #[arg(long)]
    samples: Option<usize>,

    /// RNG seed; overrides the configuration file
    #[arg(long)]
    seed: Option<u64>,

    /// Output file path. Use '-' for stdout.
    #[arg(long, default_value = "equipment_data.csv")]
    output: PathBuf,

    /// Explicit output format when the extension is ambiguous
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Audit the generated records and fail on any violation
    #[arg(long)]
    verify: bool,

    /// Skip writing <output>.manifest.toml
    #[arg(long)]
    no_manifest: bool,
}

#[derive(Debug, Clone, Args)]
struct AuditArgs {
    /// Dataset to audit
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Explicit input format when the extension is ambiguous
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Args)]
struct PredictArgs {
    /// Feature row as JSON. Read from stdin when omitted or '-'.
    #[arg(value_name = "ROW")]
    row: Option<String>,
}

/// Result of a `generate` run.
#[derive(Debug)]
struct GenerateOutcome {
    seed: u64,
    summary: DatasetSummary,
    manifest: Option<PathBuf>,
    report: Option<AuditReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = resolve_config(cli.config.as_deref())?;
    let mut logging = app.logging.clone();
    if let Some(format) = cli.log_format {
        logging.format = format.into();
    }
    init_tracing(SERVICE_NAME, &logging)?;

    match cli.command {
        Command::Generate(args) => {
            let label = args.output.display().to_string();
            let ctx = LogContext::new().with_dataset(&label).with_stage("generate");
            log_system_event(
                Some(&ctx),
                "generation.start",
                "dataset generation started",
                SystemEventOutcome::Success,
            );
            match generate(&args, &app.simulator, &mut io::stdout().lock()) {
                Ok(outcome) => {
                    log_system_event(
                        Some(&ctx),
                        "generation.complete",
                        &format!(
                            "{} records generated with seed {}",
                            outcome.summary.records, outcome.seed
                        ),
                        SystemEventOutcome::Success,
                    );
                    if !is_stdio(&args.output) {
                        eprintln!(
                            "generated {} records (seed {}) -> {}",
                            outcome.summary.records,
                            outcome.seed,
                            args.output.display()
                        );
                    }
                    if let Some(report) = &outcome.report {
                        eprintln!("verified {} records", report.checked);
                    }
                    if let Some(path) = &outcome.manifest {
                        eprintln!("manifest -> {}", path.display());
                    }
                    Ok(())
                }
                Err(err) => {
                    log_system_event(
                        Some(&ctx),
                        "generation.failed",
                        &format!("{err:#}"),
                        SystemEventOutcome::Fault,
                    );
                    Err(err)
                }
            }
        }
        Command::Audit(args) => {
            let explicit = cli.config.is_some();
            let report = audit_file(&args, &app.simulator, explicit)?;
            println!(
                "checked {} records, {} violations",
                report.checked,
                report.violations.len()
            );
            for violation in &report.violations {
                println!("  {violation}");
            }
            if report.is_clean() {
                Ok(())
            } else {
                bail!("{} invariant violations", report.violations.len())
            }
        }
        Command::Predict(args) => {
            let raw = match args.row.as_deref() {
                None | Some(STDIO) => {
                    let mut buffer = String::new();
                    io::stdin()
                        .read_to_string(&mut buffer)
                        .context("failed to read feature row from stdin")?;
                    buffer
                }
                Some(row) => row.to_owned(),
            };
            let response = predict(&raw, &app.simulator)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

/// Explicit path, then `$PM_EMS_CONFIG` or `./pm-ems.toml`, then built-in defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::from_path(path);
    }
    let env_set = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    if env_set || Path::new(DEFAULT_CONFIG_FILE).exists() {
        return AppConfig::load(&[DEFAULT_CONFIG_FILE]);
    }
    Ok(AppConfig::default())
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}

fn determine_format(path: &Path, override_format: Option<OutputFormat>) -> DatasetFormat {
    if let Some(format) = override_format {
        return format.into();
    }
    DatasetFormat::from_path(path).unwrap_or_default()
}

fn generate<W: Write>(
    args: &GenerateArgs,
    base: &SimulatorConfig,
    stdout: &mut W,
) -> Result<GenerateOutcome> {
    let mut config = base.clone();
    if let Some(samples) = args.samples {
        config.samples = samples;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let generator = DatasetGenerator::new(config).context("invalid simulator configuration")?;
    let (seed, dataset) = generator.run().context("dataset generation failed")?;
    let format = determine_format(&args.output, args.format);
    // Nothing is written unless the records pass.
    let report = if args.verify {
        Some(verify_dataset(generator.config(), &dataset)?)
    } else {
        None
    };

    if is_stdio(&args.output) {
        dataset
            .write(&mut *stdout, format)
            .context("failed to write dataset to stdout")?;
        stdout.flush()?;
    } else {
        dataset
            .write_path(&args.output, format)
            .with_context(|| format!("failed to write dataset {}", args.output.display()))?;
    }

    let summary = dataset.summary();
    let manifest = if args.no_manifest || is_stdio(&args.output) {
        None
    } else {
        let manifest = DatasetManifest::new(
            generator.config(),
            seed,
            format,
            Some(&args.output),
            summary.clone(),
        )?;
        let path = manifest
            .persist_alongside(&args.output)
            .context("failed to write dataset manifest")?;
        info!(manifest = %path.display(), "manifest written");
        Some(path)
    };

    Ok(GenerateOutcome {
        seed,
        summary,
        manifest,
        report,
    })
}

fn verify_dataset(config: &SimulatorConfig, dataset: &Dataset) -> Result<AuditReport> {
    let report = audit(config, dataset.records())?;
    for violation in &report.violations {
        error!(%violation, "invariant violated");
    }
    if !report.is_clean() {
        bail!(
            "{} of {} records violate label invariants",
            report.violations.len(),
            report.checked
        );
    }
    info!(records = report.checked, "dataset verified");
    Ok(report)
}

/// Audit a dataset file. Without an explicit config the manifest's is used.
fn audit_file(
    args: &AuditArgs,
    fallback: &SimulatorConfig,
    explicit_config: bool,
) -> Result<AuditReport> {
    let format = determine_format(&args.input, args.format);
    let dataset = Dataset::read_path(&args.input, format)
        .with_context(|| format!("failed to read dataset {}", args.input.display()))?;

    let mut config = fallback.clone();
    if !explicit_config {
        if let Some(manifest) = load_manifest_for(&args.input)? {
            if !manifest.is_consistent()? {
                warn!(
                    dataset = %args.input.display(),
                    "manifest configuration does not match its recorded hash"
                );
            }
            config = manifest.reproduction_config()?;
        }
    }
    // Audit only needs the rules; an empty file must not trip the sample check.
    config.samples = config.samples.max(1);

    let report = audit(&config, dataset.records())
        .with_context(|| format!("failed to audit {}", args.input.display()))?;
    info!(
        records = report.checked,
        violations = report.violations.len(),
        "audit finished"
    );
    Ok(report)
}

fn predict(raw: &str, config: &SimulatorConfig) -> Result<InferenceResponse> {
    let service = InferenceService::rule_based(config).context("invalid simulator configuration")?;
    let row: Value = serde_json::from_str(raw.trim()).context("feature row is not valid JSON")?;
    service.predict_json(&row).map_err(|err| {
        let body = ErrorResponse::from(&err);
        anyhow!("request rejected ({}): {}", body.status, body.message)
    })
}
