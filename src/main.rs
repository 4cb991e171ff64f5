mod config;
mod report;
mod review;
mod session;
mod source;

use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use report::ReportFormat;
use session::{Orchestrator, RunOptions, RunOutcome};
use source::github::GitHubSource;
use source::linear::LinearSource;
use source::SourceRegistration;

/// Daily Summary: reviews your recent Linear issues one by one, asks what
/// you did on each, and writes a markdown summary together with your
/// GitHub activity.
#[derive(Parser, Debug)]
#[command(name = "daily-summary", version, about)]
struct Cli {
    /// How many hours back to look for activity
    #[arg(short = 'H', long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
    hours: u32,

    /// Report layout to write
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Simplified)]
    format: ReportFormat,

    /// Directory for daily-summary-<date>.md
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Config file to use instead of ./.daily-summary.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("daily", hours = cli.hours, format = %cli.format).entered();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    // GitHub activity is best-effort; without Linear issues there is nothing to review.
    let sources = vec![
        SourceRegistration::optional(GitHubSource::new(&config.github)),
        SourceRegistration::required(LinearSource::new(&config.linear)),
    ];
    let orchestrator = Orchestrator::new(
        sources,
        RunOptions {
            hours: cli.hours,
            format: cli.format,
            output_dir: cli.output_dir,
        },
    );

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();

    let summary = orchestrator.run(Local::now(), &mut input, &mut output).await?;
    match &summary.outcome {
        RunOutcome::Written(path) => info!(path = %path.display(), worked = summary.tally.worked, "done"),
        RunOutcome::NoActivity => info!("nothing to summarize"),
    }

    Ok(())
}
