use std::env;
use std::path::{Path, PathBuf};

use aisflow_core::filter::filter_rows;
use aisflow_core::{aggregate_only, run, transform_all, FailurePolicy, PipelineConfig, RunSummary};
use aisflow_parser::{normalize_schema, read_delimited, PIPE};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Vessel-tracking batch ETL", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to $AISFLOW_CONFIG when set)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transform every input file, then aggregate into sorted datasets
    Run(PipelineArgs),
    /// Only transform input files into the intermediate directory
    Transform(PipelineArgs),
    /// Only aggregate the intermediate directory into datasets
    Aggregate(PipelineArgs),
    /// Parse one input file and report its schema and filter statistics
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Default)]
struct PipelineArgs {
    /// Directory holding the pipe-delimited input files
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Directory for per-file transformed CSVs
    #[arg(long)]
    intermediate_dir: Option<PathBuf>,
    /// Directory for dataset_<N>.csv files
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Input file extension
    #[arg(long)]
    input_extension: Option<String>,
    /// Row count at which an aggregate batch is flushed
    #[arg(long)]
    max_rows_per_file: Option<usize>,
    /// Worker threads for the transform step
    #[arg(long)]
    workers: Option<usize>,
    /// Skip files that fail to transform instead of aborting
    #[arg(long)]
    skip_failed: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Input file to inspect
    file: PathBuf,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run(args) => {
            let config = load_config(cli.config.as_deref(), &args)?;
            let summary = run(&config).context("pipeline run failed")?;
            print_summary(&summary);
            Ok(())
        }
        Command::Transform(args) => {
            let config = load_config(cli.config.as_deref(), &args)?;
            let report = transform_all(&config).context("transform failed")?;
            info!(
                transformed = report.outcomes.len(),
                failed = report.failed.len(),
                "transform finished"
            );
            Ok(())
        }
        Command::Aggregate(args) => {
            let config = load_config(cli.config.as_deref(), &args)?;
            let datasets = aggregate_only(&config).context("aggregation failed")?;
            for dataset in &datasets {
                println!("{}\t{}", dataset.path.display(), dataset.rows);
            }
            Ok(())
        }
        Command::Inspect(args) => inspect(&args.file),
    }
}

fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Defaults, then the TOML file, then `AISFLOW_*` variables, then flags.
fn load_config(path: Option<&Path>, args: &PipelineArgs) -> Result<PipelineConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var("AISFLOW_CONFIG").ok().map(PathBuf::from));

    let mut config = match path {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config
        .apply_env()
        .context("invalid AISFLOW_* environment variable")?;

    if let Some(dir) = &args.input_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &args.intermediate_dir {
        config.intermediate_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(extension) = &args.input_extension {
        config.input_extension = extension.clone();
    }
    if let Some(max_rows) = args.max_rows_per_file {
        config.max_rows_per_file = max_rows;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.skip_failed {
        config.failure_policy = FailurePolicy::Skip;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn inspect(file: &Path) -> Result<()> {
    let mut df = read_delimited(file, PIPE)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let renames = normalize_schema(&mut df)?;
    let (_, stats) = filter_rows(&df)?;

    println!("file: {}", file.display());
    println!("rows: {}", stats.rows_in);
    println!("rows matching filter: {}", stats.rows_out);
    println!("columns:");
    for name in df.get_column_names() {
        println!("  {name}");
    }
    for (from, to) in &renames.applied {
        println!("renamed: {from} -> {to}");
    }
    for (from, to) in &renames.conflicts {
        println!("conflict (kept {to}): {from}");
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Dataset"), Cell::new("Rows")]);
    for dataset in &summary.datasets {
        table.add_row(vec![
            Cell::new(dataset.path.display()),
            Cell::new(dataset.rows),
        ]);
    }
    println!("{table}");

    println!(
        "{} files transformed, {} rows read, {} retained, {} written",
        summary.files.len(),
        summary.rows_read(),
        summary.rows_retained(),
        summary.rows_written()
    );

    if !summary.failed.is_empty() {
        let mut failed = Table::new();
        failed.set_header(vec![Cell::new("Skipped file"), Cell::new("Error")]);
        for entry in &summary.failed {
            failed.add_row(vec![
                Cell::new(entry.input.display()),
                Cell::new(&entry.error),
            ]);
        }
        println!("{failed}");
    }
}
