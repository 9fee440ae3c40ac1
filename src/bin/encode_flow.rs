use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use encode_flow::analysis::AnalysisSettings;
use encode_flow::app::{AnalyzeRequest, App, IntegrateRequest};
use encode_flow::config::{ConfigLoader, ResolvedConfig};
use encode_flow::encode::EncodeHttpClient;
use encode_flow::error::FlowError;
use encode_flow::output::{
    ConsoleProgress, JsonOutput, OutputMode, print_analysis_summary, print_integration_summary,
};
use encode_flow::retry::RetryPolicy;
use encode_flow::tools::{ExtraOption, SystemToolRunner};

#[derive(Parser)]
#[command(name = "encode-flow")]
#[command(about = "Download ENCODE bigWig tracks and run deepTools analyses over them")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve experiments into a sample sheet and download their tracks")]
    Integrate(IntegrateArgs),
    #[command(about = "Compute matrix, heatmap, summary and PCA over downloaded tracks")]
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct IntegrateArgs {
    experiments: Vec<String>,

    #[arg(long, help = "Read more accessions from a file, one per line")]
    from_file: Option<Utf8PathBuf>,

    #[arg(short, long)]
    output: Utf8PathBuf,

    #[arg(long, default_value = "signal p-value")]
    signal_type: String,

    #[arg(long, default_value = "GRCh38")]
    genome_assembly: String,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    max_retries: Option<u32>,

    #[arg(long)]
    retry_delay: Option<u64>,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[arg(short, long, num_args = 1.., required = true)]
    regions: Vec<Utf8PathBuf>,

    #[arg(short, long)]
    content_dir: Utf8PathBuf,

    #[arg(short, long, help = "Bases up- and downstream of the reference point")]
    window: u32,

    #[arg(short, long)]
    output: Utf8PathBuf,

    #[arg(short = 'p', long, default_value_t = 1)]
    workers: u32,

    #[arg(long)]
    ref_point_label: Option<String>,

    #[arg(long)]
    strict_tools: bool,

    #[arg(long = "matrix-opt", allow_hyphen_values = true, help = "Extra computeMatrix option, --flag or --flag=value")]
    matrix_opts: Vec<ExtraOption>,

    #[arg(long = "heatmap-opt", allow_hyphen_values = true)]
    heatmap_opts: Vec<ExtraOption>,

    #[arg(long = "summary-opt", allow_hyphen_values = true)]
    summary_opts: Vec<ExtraOption>,

    #[arg(long = "pca-opt", allow_hyphen_values = true)]
    pca_opts: Vec<ExtraOption>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<FlowError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &FlowError) -> u8 {
    match error {
        FlowError::WrongSignalType(_)
        | FlowError::WrongGenomeAssembly(_)
        | FlowError::NoExperiments
        | FlowError::InvalidExperimentId(_)
        | FlowError::InvalidExtraOption(_)
        | FlowError::MissingConfig(_)
        | FlowError::ConfigRead(_)
        | FlowError::ConfigParse(_)
        | FlowError::DataNotFound(_) => 2,
        FlowError::EncodeHttp(_)
        | FlowError::EncodeStatus { .. }
        | FlowError::MalformedMetadata { .. }
        | FlowError::Transfer(_)
        | FlowError::DownloadFailed { .. }
        | FlowError::ToolSpawn { .. }
        | FlowError::ToolFailed { .. } => 3,
        FlowError::OutputCollision(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Integrate(args) => run_integrate(args, config, output_mode),
        Commands::Analyze(args) => run_analyze(args, config, output_mode),
    }
}

fn run_integrate(
    args: IntegrateArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let mut experiments = args.experiments;
    if let Some(path) = &args.from_file {
        let content = std::fs::read_to_string(path.as_std_path())
            .map_err(|err| FlowError::Filesystem(format!("read {path}: {err}")))?;
        experiments.extend(parse_experiment_list(&content));
    }

    let base_url = args.base_url.unwrap_or(config.base_url);
    let encode = EncodeHttpClient::with_base_url(&base_url, config.metadata_timeout)?;
    let retry = RetryPolicy::new(
        args.max_retries.unwrap_or(config.retry.max_retries),
        args.retry_delay
            .map(Duration::from_secs)
            .unwrap_or(config.retry.delay),
    );
    let app = App::new(encode, SystemToolRunner).with_retry(retry);

    let request = IntegrateRequest {
        experiments,
        output: args.output,
        signal_type: args.signal_type,
        genome_assembly: args.genome_assembly,
    };

    match output_mode {
        OutputMode::Json => {
            let report = app.integrate(&request, &JsonOutput)?;
            JsonOutput::print_integration(&report).into_diagnostic()?;
        }
        OutputMode::Human => {
            let progress = ConsoleProgress::new();
            let report = app.integrate(&request, &progress)?;
            print_integration_summary(&report);
        }
    }
    Ok(())
}

fn run_analyze(
    args: AnalyzeArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let mut settings = AnalysisSettings::new(args.window, args.workers);
    settings.ref_point_label = args.ref_point_label.unwrap_or(config.ref_point_label);
    settings.strict_tools = args.strict_tools || config.strict_tools;
    settings.options = config.tool_options;
    settings
        .options
        .compute_matrix
        .extend(args.matrix_opts.into_iter().collect());
    settings
        .options
        .plot_heatmap
        .extend(args.heatmap_opts.into_iter().collect());
    settings
        .options
        .summary
        .extend(args.summary_opts.into_iter().collect());
    settings
        .options
        .plot_pca
        .extend(args.pca_opts.into_iter().collect());

    let app = App::offline(SystemToolRunner);
    let request = AnalyzeRequest {
        regions: args.regions,
        content_dir: args.content_dir,
        output: args.output,
        settings,
    };

    match output_mode {
        OutputMode::Json => {
            let report = app.analyze(&request, &JsonOutput)?;
            JsonOutput::print_analysis(&report).into_diagnostic()?;
        }
        OutputMode::Human => {
            let report = app.analyze(&request, &ConsoleProgress::new())?;
            print_analysis_summary(&report);
        }
    }
    Ok(())
}

fn parse_experiment_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
