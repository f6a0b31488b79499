//! Command-line interface for csvpush
//!
//! Provides argument parsing and subcommand handling for the csvpush binary.

use crate::config::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Publish CSV rows as a labeled gauge to a Prometheus Pushgateway
#[derive(Parser)]
#[command(name = "csvpush")]
#[command(version)]
#[command(about = "Publish CSV rows as a labeled gauge to a Prometheus Pushgateway")]
#[command(
    long_about = "csvpush reads a CSV file, uses the header row as label names for a gauge, \
    and pushes the gauge to a Pushgateway once per data row with that row's labels set to 1."
)]
pub struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Push every row of a CSV file
    Push(PushArgs),
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Input file and per-run overrides of configuration values
#[derive(Args, Debug, Default)]
pub struct PushArgs {
    /// CSV file whose first row holds the label names
    pub input: PathBuf,

    /// Metric name
    #[arg(short, long)]
    pub metric: Option<String>,

    /// Metric help text
    #[arg(short, long)]
    pub description: Option<String>,

    /// Job name used as the grouping key on the gateway
    #[arg(short, long)]
    pub job: Option<String>,

    /// Pushgateway address (host:port or URL)
    #[arg(short, long)]
    pub gateway: Option<String>,

    /// Push timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

impl PushArgs {
    /// Overwrite configuration values with the flags that were given
    pub fn apply(&self, config: &mut Config) {
        if let Some(metric) = &self.metric {
            config.metric.name = metric.clone();
        }
        if let Some(description) = &self.description {
            config.metric.help = description.clone();
        }
        if let Some(job) = &self.job {
            config.metric.job = job.clone();
        }
        if let Some(gateway) = &self.gateway {
            config.gateway.address = gateway.clone();
        }
        if let Some(timeout) = self.timeout {
            config.gateway.timeout_seconds = timeout;
        }
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# csvpush Configuration
# ======================
#
# Every section is optional. Flags given to `csvpush push` override the
# values in this file.

# ─────────────────────────────────────────────────────────────────────────────
# METRIC
# ─────────────────────────────────────────────────────────────────────────────
#
# The CSV header row supplies the label names. Every data row sets the gauge
# to 1 for its label values and pushes the whole metric family.

[metric]
# Metric name (letters, digits and underscores, not starting with a digit)
name = "example_metric"

# Help text shown on the gateway
help = "An example metric for demonstration purposes."

# Job name; the gateway groups and replaces pushes by this key
job = "example_job"

# ─────────────────────────────────────────────────────────────────────────────
# GATEWAY
# ─────────────────────────────────────────────────────────────────────────────

[gateway]
# host:port or full URL of the Pushgateway
address = "localhost:9091"

# Seconds to wait for each push before reporting it as failed (1-300)
timeout_seconds = 30

# "put" replaces every metric under the grouping key
# "post" replaces only metrics with the same name
method = "put"

# Extra grouping labels appended after the job (optional)
# [gateway.grouping]
# instance = "host-1"

# ─────────────────────────────────────────────────────────────────────────────
# SOURCE
# ─────────────────────────────────────────────────────────────────────────────

[source]
# Single-character field delimiter
delimiter = ","

# Strip whitespace around headers and fields
trim = false

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG takes precedence when set
log_level = "info"
"#
}
