//! Metric publisher
//!
//! Turns CSV rows into pushes of a presence gauge. The header row defines
//! the label schema, each following row sets one labeled series to `1` and
//! triggers one push of the whole family. Rows are handled strictly in file
//! order and a failed push never stops the run.

use crate::config::{Config, GatewayConfig, SourceConfig};
use crate::error::{AppResult, PublishError};
use crate::events::{EventSink, PublishEvent, TracingSink};
use crate::gateway::{PushgatewayClient, Pusher};
use crate::metrics::{MetricDefinition, PresenceGauge};
use crate::source::CsvSource;
use std::path::Path;
use std::sync::Arc;

/// Result of publishing a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The series was set and the family pushed
    Pushed,
    /// The series was set but the push failed
    Failed(PublishError),
    /// Nothing was changed and nothing was sent
    Rejected(PublishError),
}

/// Counts for one `publish_from_source` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Data rows read, header excluded
    pub rows: usize,
    pub pushed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Publishes rows of label values as a gauge to a push destination
pub struct MetricPublisher {
    metric_name: String,
    help: String,
    job_name: String,
    source: SourceConfig,
    pusher: Arc<dyn Pusher>,
    sink: Arc<dyn EventSink>,
    gauge: Option<PresenceGauge>,
}

impl MetricPublisher {
    /// Create a publisher with an explicit push destination and event sink
    ///
    /// No schema exists until `define_schema` or `publish_from_source` runs.
    pub fn new(
        metric_name: impl Into<String>,
        help: impl Into<String>,
        job_name: impl Into<String>,
        pusher: Arc<dyn Pusher>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            help: help.into(),
            job_name: job_name.into(),
            source: SourceConfig::default(),
            pusher,
            sink,
            gauge: None,
        }
    }

    /// Create a publisher that pushes to the Pushgateway at `endpoint_address`
    ///
    /// Events are written to the tracing subscriber. Empty names are accepted;
    /// the registry or the gateway rejects them later.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot form a URL or the HTTP client
    /// cannot be built.
    pub fn configure(
        metric_name: impl Into<String>,
        help: impl Into<String>,
        job_name: impl Into<String>,
        endpoint_address: impl Into<String>,
    ) -> AppResult<Self> {
        let gateway = GatewayConfig {
            address: endpoint_address.into(),
            ..GatewayConfig::default()
        };
        let pusher = PushgatewayClient::new(&gateway)?;
        Ok(Self::new(
            metric_name,
            help,
            job_name,
            Arc::new(pusher),
            Arc::new(TracingSink),
        ))
    }

    /// Create a publisher from a validated configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let pusher = PushgatewayClient::new(&config.gateway)?;
        Ok(Self::new(
            config.metric.name.clone(),
            config.metric.help.clone(),
            config.metric.job.clone(),
            Arc::new(pusher),
            Arc::new(TracingSink),
        )
        .with_source_config(config.source.clone()))
    }

    /// Use `source` when reading CSV input
    pub fn with_source_config(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Current schema, if one has been defined
    pub fn definition(&self) -> Option<&MetricDefinition> {
        self.gauge.as_ref().map(PresenceGauge::definition)
    }

    /// Current gauge, if a schema has been defined
    pub fn gauge(&self) -> Option<&PresenceGauge> {
        self.gauge.as_ref()
    }

    /// (Re)create the gauge with exactly these label names
    ///
    /// Replaces the registry, discarding every series recorded so far.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidSchema` for duplicate or invalid label names
    /// or an invalid metric name. The previous gauge is kept in that case.
    pub fn define_schema(&mut self, label_names: Vec<String>) -> AppResult<()> {
        let definition = MetricDefinition::new(&self.metric_name, &self.help, label_names)?;
        let gauge = PresenceGauge::new(definition)?;

        if self.gauge.is_some() {
            tracing::info!(
                metric = %self.metric_name,
                "Redefining schema, previous series discarded"
            );
        }
        tracing::info!(
            metric = %self.metric_name,
            labels = ?gauge.definition().label_names(),
            "Defined gauge schema"
        );

        self.gauge = Some(gauge);
        Ok(())
    }

    /// Set the series for `label_values` to `1` and push the whole family
    ///
    /// Every outcome is reported to the event sink. A missing schema or a
    /// length mismatch is reported without touching the family or the
    /// network. A failed push is reported and not retried.
    pub async fn publish<S: AsRef<str>>(&self, label_values: &[S]) -> RowOutcome {
        let labels: Vec<String> = label_values
            .iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        let Some(gauge) = &self.gauge else {
            return self.reject(labels, PublishError::SchemaNotDefined);
        };

        if let Err(error) = gauge.mark_present(label_values) {
            return self.reject(labels, error);
        }

        let families = gauge.gather();
        match self.pusher.push(&self.job_name, &families).await {
            Ok(()) => {
                self.sink.emit(PublishEvent::Pushed { labels });
                RowOutcome::Pushed
            }
            Err(error) => {
                self.sink.emit(PublishEvent::PushFailed {
                    labels,
                    error: error.clone(),
                });
                RowOutcome::Failed(error)
            }
        }
    }

    /// Publish every row of the CSV file at `path`
    ///
    /// Defines the schema from the header row, then publishes each row whose
    /// width matches the header. Other rows are reported and skipped.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or read, has no header, or the
    /// header does not form a valid schema. Push failures are not errors.
    pub async fn publish_from_source<P: AsRef<Path>>(&mut self, path: P) -> AppResult<RunSummary> {
        let source = CsvSource::open(path, &self.source)?;
        let path_display = source.path().to_string();
        self.define_schema(source.header().to_vec())?;
        let expected = source.header().len();

        tracing::info!(
            path = %path_display,
            endpoint = %self.pusher.endpoint(),
            job = %self.job_name,
            "Publishing rows"
        );

        let mut summary = RunSummary::default();
        for row in source.into_rows() {
            let row = row?;
            summary.rows += 1;

            if row.values.len() != expected {
                self.sink.emit(PublishEvent::RowSkipped {
                    line: row.line,
                    row: row.values,
                    expected,
                });
                summary.skipped += 1;
                continue;
            }

            match self.publish(&row.values).await {
                RowOutcome::Pushed => summary.pushed += 1,
                RowOutcome::Failed(_) => summary.failed += 1,
                RowOutcome::Rejected(_) => summary.skipped += 1,
            }
        }

        tracing::info!(
            path = %path_display,
            rows = summary.rows,
            pushed = summary.pushed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Finished publishing"
        );

        Ok(summary)
    }

    fn reject(&self, labels: Vec<String>, error: PublishError) -> RowOutcome {
        self.sink.emit(PublishEvent::Rejected {
            labels,
            error: error.clone(),
        });
        RowOutcome::Rejected(error)
    }
}
