//! csvpush - publish CSV rows as a labeled gauge to a Prometheus Pushgateway
//!
//! The header row of a CSV file becomes the label schema of a gauge. Each
//! data row sets the gauge to 1 for its label values and pushes the whole
//! metric family to the gateway, one push per row.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod metrics;
pub mod publisher;
pub mod source;
pub mod telemetry;
