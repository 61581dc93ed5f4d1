//! Meanfield Core - variational inference CLI
//!
//! The main entry point for mf-core, handling:
//! - Fitting the three supported Gaussian models to a data file
//! - Synthetic data generation
//! - Configuration inspection and validation

use clap::{Args, Parser, Subcommand};
use mf_common::{format_error_human, Error, ErrorResponse, OutputFormat};
use mf_config::priors::MixturePrior;
use mf_config::CONFIG_SCHEMA_VERSION;
use mf_core::config::{load_config, validate_file, ConfigOptions, ResolvedConfig};
use mf_core::exit_codes::ExitCode;
use mf_core::inference::{infer, InferenceSettings};
use mf_core::ingest::{format_values, read_values};
use mf_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use mf_core::model::{
    build_gaussian_mean_model, build_gaussian_mean_precision_model, build_mixture_model,
    ModelKind, ModelSpec,
};
use mf_core::report::{FitOutput, OUTPUT_SCHEMA_VERSION};
use mf_core::synth::{generate, parse_sources, Source};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Meanfield Core - mean-field variational inference for Gaussian models
#[derive(Parser)]
#[command(name = "mf-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Override config directory (falls back to MEANFIELD_CONFIG_DIR, then XDG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Relative ELBO tolerance (overrides engine.json)
    #[arg(long, global = true)]
    tolerance: Option<f64>,

    /// Sweep cap (overrides engine.json)
    #[arg(long, global = true)]
    max_iterations: Option<usize>,

    /// RNG seed for initialisation and synthetic data (overrides engine.json)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Independently seeded mixture runs (overrides engine.json)
    #[arg(long, global = true)]
    restarts: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a Gaussian with unknown mean and known noise precision
    Mean(MeanArgs),

    /// Fit a Gaussian with unknown mean and unknown precision
    MeanPrecision(MeanPrecisionArgs),

    /// Fit a k-component Gaussian mixture
    Mixture(MixtureArgs),

    /// Generate synthetic data in the format the fit commands read
    Synth(SynthArgs),

    /// Inspect or validate configuration
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct DataArgs {
    /// Data file: numbers separated by commas and/or newlines
    #[arg(long, short = 'd')]
    data: PathBuf,

    /// Fail unless the file holds exactly this many values
    #[arg(long)]
    expected_n: Option<usize>,
}

#[derive(Args, Debug)]
struct MeanArgs {
    #[command(flatten)]
    input: DataArgs,

    /// Prior mean of the unknown mean
    #[arg(long, allow_negative_numbers = true)]
    prior_mean: Option<f64>,

    /// Prior precision of the unknown mean
    #[arg(long)]
    prior_precision: Option<f64>,

    /// Known observation noise precision
    #[arg(long)]
    noise_precision: Option<f64>,
}

#[derive(Args, Debug)]
struct MeanPrecisionArgs {
    #[command(flatten)]
    input: DataArgs,

    #[arg(long, allow_negative_numbers = true)]
    prior_mean: Option<f64>,

    #[arg(long)]
    prior_precision: Option<f64>,

    /// Gamma prior shape of the precision
    #[arg(long)]
    shape: Option<f64>,

    /// Gamma prior rate of the precision
    #[arg(long)]
    rate: Option<f64>,
}

#[derive(Args, Debug)]
struct MixtureArgs {
    #[command(flatten)]
    input: DataArgs,

    /// Number of components
    #[arg(long = "components", short = 'k')]
    components: Option<usize>,

    #[arg(long, allow_negative_numbers = true)]
    prior_mean: Option<f64>,

    #[arg(long)]
    prior_precision: Option<f64>,

    #[arg(long)]
    shape: Option<f64>,

    #[arg(long)]
    rate: Option<f64>,

    /// Dirichlet concentration: one value (symmetric) or k comma-separated values
    #[arg(long, value_delimiter = ',')]
    concentration: Option<Vec<f64>>,

    /// Number of leading points whose assignment posterior is shown
    #[arg(long)]
    show_points: Option<usize>,
}

#[derive(Args, Debug)]
struct SynthArgs {
    /// Number of points
    #[arg(short = 'n', long)]
    count: usize,

    /// Mean of a single Gaussian source
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    mean: f64,

    /// Precision of a single Gaussian source
    #[arg(long, default_value_t = 1.0)]
    precision: f64,

    /// Mixture sources as weight:mean:precision,... (overrides --mean/--precision)
    #[arg(long, allow_hyphen_values = true)]
    mixture: Option<String>,

    /// Values per output line
    #[arg(long, default_value_t = 10)]
    per_line: usize,

    /// Write data here instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,

    /// Validate a config file or directory
    Validate {
        /// priors.json / engine.json file or a config directory
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here, on stdout.
            let code = if e.use_stderr() {
                ExitCode::ArgsError.as_i32()
            } else {
                0
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    // Machine-readable stdout gets machine-readable stderr.
    let cli_format = cli
        .global
        .format
        .prefers_structured_logs()
        .then_some(LogFormat::Jsonl);
    init_logging(&LogConfig::from_env(cli_level, cli_format));

    let exit_code = match &cli.command {
        Commands::Mean(args) => run_fit(&cli.global, FitCommand::Mean(args)),
        Commands::MeanPrecision(args) => run_fit(&cli.global, FitCommand::MeanPrecision(args)),
        Commands::Mixture(args) => run_fit(&cli.global, FitCommand::Mixture(args)),
        Commands::Synth(args) => run_synth(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Converged
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Fitting
// ============================================================================

enum FitCommand<'a> {
    Mean(&'a MeanArgs),
    MeanPrecision(&'a MeanPrecisionArgs),
    Mixture(&'a MixtureArgs),
}

impl FitCommand<'_> {
    fn kind(&self) -> ModelKind {
        match self {
            FitCommand::Mean(_) => ModelKind::GaussianMean,
            FitCommand::MeanPrecision(_) => ModelKind::GaussianMeanPrecision,
            FitCommand::Mixture(_) => ModelKind::Mixture,
        }
    }

    fn input(&self) -> &DataArgs {
        match self {
            FitCommand::Mean(a) => &a.input,
            FitCommand::MeanPrecision(a) => &a.input,
            FitCommand::Mixture(a) => &a.input,
        }
    }
}

fn run_fit(global: &GlobalOpts, command: FitCommand<'_>) -> ExitCode {
    let run_id = generate_run_id();
    let ctx = LogContext::new(run_id.clone()).with_model(command.kind().to_string());
    {
        let span = ctx.stage_span(Stage::Init);
        let _enter = span.enter();
        tracing::info!(
            target: event_names::RUN_STARTED,
            command = %command.kind(),
            data = %command.input().data.display(),
            "run started"
        );
    }

    match fit(global, &ctx, &command) {
        Ok(output) => {
            let code = ExitCode::from(output.report.status);
            emit_fit(global, &output);
            let span = ctx.stage_span(Stage::Report);
            let _enter = span.enter();
            tracing::info!(
                target: event_names::RUN_FINISHED,
                exit_code = code.as_i32(),
                "run finished"
            );
            code
        }
        Err(err) => output_error(global, &run_id, &err),
    }
}

fn fit(
    global: &GlobalOpts,
    ctx: &LogContext,
    command: &FitCommand<'_>,
) -> mf_common::Result<FitOutput> {
    let config = {
        let span = ctx.stage_span(Stage::Init);
        let _enter = span.enter();
        load_resolved_config(global)?
    };
    let settings = inference_settings(global, &config);
    settings.validate()?;

    let input = command.input();
    let values = {
        let span = ctx.stage_span(Stage::Ingest);
        let _enter = span.enter();
        let values = read_values(&input.data, input.expected_n)?;
        tracing::info!(
            target: event_names::INGEST_FINISHED,
            path = %input.data.display(),
            n = values.len(),
            "data loaded"
        );
        values
    };

    let spec = {
        let span = ctx.stage_span(Stage::Build);
        let _enter = span.enter();
        let spec = build_model(command, &config, &values)?;
        tracing::info!(
            target: event_names::MODEL_BUILT,
            variables = spec.variables().len(),
            components = spec.components().len(),
            n = spec.data().len(),
            "model declared"
        );
        spec
    };

    let report = {
        let span = ctx.stage_span(Stage::Infer);
        let _enter = span.enter();
        infer(&spec, settings)?
    };

    let span = ctx.stage_span(Stage::Report);
    let _enter = span.enter();
    let points = match command {
        FitCommand::Mixture(args) => args
            .show_points
            .unwrap_or(config.engine.diagnostic_points),
        _ => config.engine.diagnostic_points,
    };
    FitOutput::new(
        ctx.run_id.clone(),
        &spec,
        Some(input.data.as_path()),
        settings,
        report,
        points,
    )
}

fn load_resolved_config(global: &GlobalOpts) -> mf_common::Result<ResolvedConfig> {
    let config = load_config(&ConfigOptions {
        config_dir: global.config.clone(),
    })?;
    tracing::info!(
        target: event_names::CONFIG_LOADED,
        priors_source = %config.priors_source,
        engine_source = %config.engine_source,
        "configuration resolved"
    );
    if config.priors_path.is_none() && config.engine_path.is_none() {
        tracing::debug!(
            target: event_names::CONFIG_DEFAULT_USED,
            "no config files found; using built-in defaults"
        );
    }
    Ok(config)
}

/// engine.json values with command-line overrides applied.
fn inference_settings(global: &GlobalOpts, config: &ResolvedConfig) -> InferenceSettings {
    InferenceSettings {
        tolerance: global.tolerance.unwrap_or(config.engine.tolerance),
        max_iterations: global.max_iterations.unwrap_or(config.engine.max_iterations),
        seed: global.seed.unwrap_or(config.engine.seed),
        restarts: global.restarts.unwrap_or(config.engine.restarts),
    }
}

fn build_model(
    command: &FitCommand<'_>,
    config: &ResolvedConfig,
    values: &[f64],
) -> mf_common::Result<ModelSpec> {
    let priors = &config.priors;
    let spec = match command {
        FitCommand::Mean(a) => {
            build_gaussian_mean_model(
                a.prior_mean.unwrap_or(priors.mean.mean),
                a.prior_precision.unwrap_or(priors.mean.precision),
                a.noise_precision.unwrap_or(priors.mean.noise_precision),
                values,
            )?
            .0
        }
        FitCommand::MeanPrecision(a) => {
            build_gaussian_mean_precision_model(
                a.prior_mean.unwrap_or(priors.mean.mean),
                a.prior_precision.unwrap_or(priors.mean.precision),
                a.shape.unwrap_or(priors.precision.shape),
                a.rate.unwrap_or(priors.precision.rate),
                values,
            )?
            .0
        }
        FitCommand::Mixture(a) => {
            let k = a.components.unwrap_or(priors.mixture.components);
            let concentration = mixture_concentration(a, &priors.mixture, k);
            build_mixture_model(
                k,
                a.prior_mean.unwrap_or(priors.mean.mean),
                a.prior_precision.unwrap_or(priors.mean.precision),
                a.shape.unwrap_or(priors.precision.shape),
                a.rate.unwrap_or(priors.precision.rate),
                &concentration,
                values,
            )?
            .0
        }
    };
    Ok(spec)
}

/// Concentration from the command line, else the configured one sized to `k`.
///
/// A configured vector whose length is neither 1 nor `k` is passed through
/// unchanged for the builder to reject.
fn mixture_concentration(args: &MixtureArgs, prior: &MixturePrior, k: usize) -> Vec<f64> {
    match &args.concentration {
        Some(c) => c.clone(),
        None => prior
            .concentration_for(k)
            .unwrap_or_else(|| prior.concentration.clone()),
    }
}

fn emit_fit(global: &GlobalOpts, output: &FitOutput) {
    match global.format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Md => print!("{}", output.render_markdown()),
        OutputFormat::Summary => println!("{}", output.render_summary()),
        OutputFormat::Exitcode => {}
    }
}

// ============================================================================
// Synthetic data
// ============================================================================

fn run_synth(global: &GlobalOpts, args: &SynthArgs) -> ExitCode {
    let run_id = generate_run_id();
    match synth(global, args) {
        Ok(Some(summary)) => {
            match global.format {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Exitcode => {}
                _ => println!(
                    "wrote {} values to {}",
                    summary["n"],
                    summary["path"].as_str().unwrap_or("?")
                ),
            }
            ExitCode::Converged
        }
        Ok(None) => ExitCode::Converged,
        Err(err) => output_error(global, &run_id, &err),
    }
}

/// Returns a JSON summary when the data went to a file.
fn synth(global: &GlobalOpts, args: &SynthArgs) -> mf_common::Result<Option<serde_json::Value>> {
    let sources = match &args.mixture {
        Some(text) => parse_sources(text)?,
        None => vec![Source::new(1.0, args.mean, args.precision)?],
    };
    let seed = global.seed.unwrap_or(0);
    let (values, labels) = generate(&sources, args.count, seed)?;
    let text = format_values(&values, args.per_line);

    match &args.output {
        Some(path) => {
            std::fs::write(path, text)?;
            let mut counts = vec![0usize; sources.len()];
            for &l in &labels {
                counts[l] += 1;
            }
            Ok(Some(serde_json::json!({
                "schema_version": OUTPUT_SCHEMA_VERSION,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "path": path.display().to_string(),
                "n": values.len(),
                "seed": seed,
                "sources": sources,
                "counts": counts,
            })))
        }
        None => {
            print!("{}", text);
            Ok(None)
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    match &args.command {
        ConfigCommands::Show => run_config_show(global),
        ConfigCommands::Validate { path } => run_config_validate(global, path.as_deref()),
    }
}

/// Display the current configuration (including defaults if no files present).
fn run_config_show(global: &GlobalOpts) -> ExitCode {
    let run_id = generate_run_id();
    let config = match load_resolved_config(global) {
        Ok(c) => c,
        Err(e) => return output_error(global, &run_id, &e),
    };
    let snapshot = config.snapshot();

    match global.format {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "schema_version": OUTPUT_SCHEMA_VERSION,
                "run_id": run_id,
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "config": snapshot,
            });
            print_json(&response);
        }
        OutputFormat::Summary => {
            println!(
                "[{}] config: priors={} engine={}",
                run_id,
                describe_source(snapshot.priors_path.as_deref()),
                describe_source(snapshot.engine_path.as_deref())
            );
        }
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            println!("# mf-core config show");
            println!();
            println!("## Priors");
            println!("Source: {} ({})", describe_source(snapshot.priors_path.as_deref()), snapshot.priors_source);
            println!(
                "Mean prior: N({}, precision {}), noise precision {}",
                config.priors.mean.mean, config.priors.mean.precision, config.priors.mean.noise_precision
            );
            println!(
                "Precision prior: Gamma({}, {})",
                config.priors.precision.shape, config.priors.precision.rate
            );
            println!(
                "Mixture: k = {}, concentration {:?}",
                config.priors.mixture.components, config.priors.mixture.concentration
            );
            println!();
            println!("## Engine");
            println!("Source: {} ({})", describe_source(snapshot.engine_path.as_deref()), snapshot.engine_source);
            println!(
                "tolerance {}, max_iterations {}, seed {}, restarts {}",
                config.engine.tolerance,
                config.engine.max_iterations,
                config.engine.seed,
                config.engine.restarts
            );
        }
    }
    ExitCode::Converged
}

/// Validate configuration files.
fn run_config_validate(global: &GlobalOpts, path: Option<&Path>) -> ExitCode {
    let run_id = generate_run_id();

    let result: mf_common::Result<Vec<String>> = match path {
        Some(p) if p.is_file() => validate_file(p)
            .map(|kind| vec![format!("{}: {}", kind, p.display())])
            .map_err(Error::from),
        Some(p) => load_config(&ConfigOptions {
            config_dir: Some(p.to_path_buf()),
        })
        .map(|c| checked_files(&c))
        .map_err(Error::from),
        None => load_resolved_config(global).map(|c| checked_files(&c)),
    };

    match result {
        Ok(checked) => {
            match global.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "schema_version": OUTPUT_SCHEMA_VERSION,
                    "run_id": run_id,
                    "generated_at": chrono::Utc::now().to_rfc3339(),
                    "status": "valid",
                    "checked": checked,
                })),
                OutputFormat::Summary => println!("[{}] config validate: OK", run_id),
                OutputFormat::Exitcode => {}
                OutputFormat::Md => {
                    println!("# Configuration Validation");
                    println!();
                    println!("Status: valid");
                    for c in &checked {
                        println!("- {}", c);
                    }
                }
            }
            ExitCode::Converged
        }
        Err(e) => output_error(global, &run_id, &e),
    }
}

fn checked_files(config: &ResolvedConfig) -> Vec<String> {
    vec![
        format!("priors: {}", describe_source(config.priors_path.as_deref())),
        format!("engine: {}", describe_source(config.engine_path.as_deref())),
    ]
}

fn describe_source(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string())
}

// ============================================================================
// Shared output
// ============================================================================

fn print_version(global: &GlobalOpts) {
    let version_info = serde_json::json!({
        "mf_core_version": env!("CARGO_PKG_VERSION"),
        "output_schema_version": OUTPUT_SCHEMA_VERSION,
        "config_schema_version": CONFIG_SCHEMA_VERSION,
        "rust_version": env!("CARGO_PKG_RUST_VERSION"),
    });

    match global.format {
        OutputFormat::Json => print_json(&version_info),
        OutputFormat::Exitcode => {}
        _ => {
            println!("mf-core {}", env!("CARGO_PKG_VERSION"));
            println!("config schema version: {}", CONFIG_SCHEMA_VERSION);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("mf-core: failed to serialise output: {}", e),
    }
}

/// Report an error on stderr in the requested format and pick the exit code.
fn output_error(global: &GlobalOpts, run_id: &str, err: &Error) -> ExitCode {
    let code = ExitCode::for_error(err);
    if code == ExitCode::InternalError {
        tracing::error!(target: event_names::INTERNAL_ERROR, run_id, error = %err, "internal error");
    }

    match global.format {
        OutputFormat::Json => {
            let response = ErrorResponse::from(err)
                .with_context("run_id", run_id)
                .with_context("exit_code", code.as_i32());
            eprintln!("{}", response.to_json_pretty());
        }
        OutputFormat::Summary => eprintln!("[{}] error: {}", run_id, err),
        OutputFormat::Exitcode => {}
        OutputFormat::Md => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mf-core").chain(args.iter().copied())).unwrap()
    }

    fn mixture_args(cli: &Cli) -> &MixtureArgs {
        match &cli.command {
            Commands::Mixture(a) => a,
            _ => panic!("expected the mixture subcommand"),
        }
    }

    fn two_clusters() -> Vec<f64> {
        (0..40)
            .map(|i| if i % 2 == 0 { -6.0 } else { 6.0 } + (i % 5) as f64 * 0.1)
            .collect()
    }

    #[test]
    fn overridden_k_with_builtin_priors_builds() {
        let config = ResolvedConfig::builtin();
        let data = two_clusters();
        for k in [1usize, 2, 4] {
            let k_arg = k.to_string();
            let cli = parse(&["mixture", "--data", "x.csv", "-k", &k_arg]);
            let command = FitCommand::Mixture(mixture_args(&cli));
            let spec = build_model(&command, &config, &data).unwrap();
            assert_eq!(spec.kind(), ModelKind::Mixture);

            let settings = InferenceSettings {
                restarts: 2,
                ..InferenceSettings::default()
            };
            let report = infer(&spec, settings).unwrap();
            assert!(report.elbo.is_finite(), "k={} gave ELBO {}", k, report.elbo);
        }
    }

    #[test]
    fn default_concentration_broadcasts_to_k() {
        let cli = parse(&["mixture", "--data", "x.csv", "-k", "2"]);
        let prior = MixturePrior::default();
        assert_eq!(mixture_concentration(mixture_args(&cli), &prior, 2), vec![1.1, 1.1]);
    }

    #[test]
    fn cli_concentration_wins() {
        let cli = parse(&["mixture", "--data", "x.csv", "-k", "2", "--concentration", "0.5,2"]);
        let prior = MixturePrior::default();
        assert_eq!(mixture_concentration(mixture_args(&cli), &prior, 2), vec![0.5, 2.0]);
    }

    #[test]
    fn mismatched_configured_concentration_is_a_config_error() {
        let mut config = ResolvedConfig::builtin();
        config.priors.mixture.concentration = vec![1.0, 1.0, 1.0];
        let cli = parse(&["mixture", "--data", "x.csv", "-k", "2"]);
        let err = build_model(&FitCommand::Mixture(mixture_args(&cli)), &config, &two_clusters())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {:?}", err);
    }
}
