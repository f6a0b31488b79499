//! csvpush binary
//!
//! Reads a CSV file and pushes one gauge update per row to a Pushgateway.

use clap::Parser;
use csvpush::cli::{Cli, Command, PushArgs, generate_config_template};
use csvpush::config::Config;
use csvpush::publisher::MetricPublisher;
use csvpush::telemetry;
use std::path::Path;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Config { output } => {
            let template = generate_config_template();
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Wrote configuration template to {}", path.display());
                }
                None => print!("{}", template),
            }
            Ok(())
        }
        Command::Push(args) => push(cli.config.as_deref(), &args).await,
    }
}

async fn push(config_path: Option<&Path>, args: &PushArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    telemetry::init(&config.observability.log_level);

    let mut publisher = MetricPublisher::from_config(&config)?;
    let summary = match publisher.publish_from_source(&args.input).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(error = %e, input = %args.input.display(), "Publishing aborted");
            return Err(e.into());
        }
    };

    tracing::info!(
        rows = summary.rows,
        pushed = summary.pushed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Run complete"
    );

    Ok(())
}
