use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use ntc_runner::config::DispatcherConfig;
use ntc_runner::parser::parse_output;
use ntc_runner::report::{table_header, CompletionRow, Progress};
use ntc_runner::result::RunResult;
use ntc_runner::scheduler::load_job_file;
use ntc_runner::Dispatcher;

#[derive(Parser, Debug)]
#[command(name = "ntc-runner")]
#[command(version)]
#[command(about = "Run batches of ntc-cli jobs across multiple GPUs")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Dispatch a JSON job file across device slots
    Run(RunArgs),

    /// Parse a captured ntc-cli log and print the interpreted result
    Parse {
        /// Log file to read (stdin when omitted)
        file: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// JSON file with an array of jobs
    #[arg(long, short = 'j')]
    jobs: PathBuf,

    /// Device slots, one worker each (comma-separated)
    #[arg(long, short = 'd', value_delimiter = ',', default_value = "0")]
    devices: Vec<u32>,

    /// Flag used to pass the device index to the tool
    #[arg(long, default_value = "--cudaDevice", allow_hyphen_values = true)]
    device_flag: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Serialize)]
struct CompletionOutput<'a> {
    #[serde(flatten)]
    row: CompletionRow,
    result: &'a RunResult,
    completed: usize,
    total: usize,
}

// =============================================================================
// Command Handlers
// =============================================================================

async fn handle_run(args: RunArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let jobs = load_job_file(&args.jobs).await?;
    let config = DispatcherConfig::new(args.devices).with_device_flag(args.device_flag);
    let dispatcher = Dispatcher::new(config);

    let output = args.output;
    if matches!(output, OutputFormat::Table) {
        println!("{}", table_header());
    }

    let started = Instant::now();
    let summary = dispatcher
        .run(jobs, move |job, result, total, completed| {
            let row = CompletionRow::new(job.payload.clone(), job.device(), result);
            match output {
                OutputFormat::Table => println!("{}", row.to_table_row()),
                OutputFormat::Json => {
                    let line = serde_json::to_string(&CompletionOutput {
                        row,
                        result,
                        completed,
                        total,
                    })?;
                    println!("{}", line);
                }
            }
            eprintln!(
                "{}",
                Progress::new(completed, total, started.elapsed()).status_line()
            );
            Ok(())
        })
        .await?;

    if summary.aborted {
        eprintln!(
            "Batch aborted: {} of {} jobs completed.",
            summary.completed, summary.total
        );
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_parse(file: Option<PathBuf>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            text
        }
    };

    let result = parse_output(&text);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Run(run_args) => handle_run(run_args).await,
        Commands::Parse { file } => handle_parse(file).await,
    }
}
