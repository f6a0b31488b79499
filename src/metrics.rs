//! Presence gauge backed by a private Prometheus registry
//!
//! Each CSV header becomes one `GaugeVec` whose label names are the header
//! columns. Every data row sets one labeled series to `1`, recording that the
//! label combination exists. Series are never removed, so the family grows
//! with every distinct combination seen during a run.
//!
//! The registry belongs to a single `PresenceGauge`; two publishers never
//! share metric state.

use crate::error::{AppError, AppResult, PublishError};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashSet;

/// Value written for every observed label combination
pub const PRESENCE_VALUE: f64 = 1.0;

/// Help text registered when none is configured
const EMPTY_HELP: &str = " ";

/// Immutable description of the gauge: name, help and ordered label names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDefinition {
    name: String,
    help: String,
    label_names: Vec<String>,
}

impl MetricDefinition {
    /// Create a definition, rejecting duplicate label names
    ///
    /// Label order is significant: row values bind to labels by position.
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        label_names: Vec<String>,
    ) -> AppResult<Self> {
        let name = name.into();

        let mut seen = HashSet::with_capacity(label_names.len());
        for label in &label_names {
            if !seen.insert(label.as_str()) {
                return Err(AppError::InvalidSchema {
                    metric: name,
                    reason: format!("duplicate label name '{}'", label),
                });
            }
        }

        Ok(Self {
            name,
            help: help.into(),
            label_names,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

/// Gauge vector registered in its own registry
pub struct PresenceGauge {
    definition: MetricDefinition,
    registry: Registry,
    gauge: GaugeVec,
}

impl PresenceGauge {
    /// Register a gauge for `definition` in a fresh registry
    ///
    /// An empty help text is registered as a single space, since the registry
    /// refuses empty help. The exposition then carries a blank `# HELP` line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidSchema` if the registry refuses the metric
    /// name or any label name.
    pub fn new(definition: MetricDefinition) -> AppResult<Self> {
        let invalid = |e: prometheus::Error| AppError::InvalidSchema {
            metric: definition.name.clone(),
            reason: e.to_string(),
        };

        let help = if definition.help.is_empty() {
            EMPTY_HELP.to_string()
        } else {
            definition.help.clone()
        };

        let label_refs: Vec<&str> = definition.label_names.iter().map(String::as_str).collect();
        let gauge =
            GaugeVec::new(Opts::new(definition.name.clone(), help), &label_refs).map_err(invalid)?;

        let registry = Registry::new();
        registry.register(Box::new(gauge.clone())).map_err(invalid)?;

        tracing::debug!(
            metric = %definition.name,
            labels = ?definition.label_names,
            "Registered presence gauge"
        );

        Ok(Self {
            definition,
            registry,
            gauge,
        })
    }

    pub fn definition(&self) -> &MetricDefinition {
        &self.definition
    }

    /// Number of labels a row must provide
    pub fn label_count(&self) -> usize {
        self.definition.label_names.len()
    }

    /// Set the series identified by `label_values` to `PRESENCE_VALUE`
    ///
    /// Values bind positionally to the definition's label names. A length
    /// mismatch leaves the family untouched.
    pub fn mark_present<S: AsRef<str>>(&self, label_values: &[S]) -> Result<(), PublishError> {
        if label_values.len() != self.label_count() {
            return Err(PublishError::RowShapeMismatch {
                expected: self.label_count(),
                actual: label_values.len(),
            });
        }

        let values: Vec<&str> = label_values.iter().map(AsRef::as_ref).collect();
        let series = self
            .gauge
            .get_metric_with_label_values(&values)
            .map_err(|_| PublishError::RowShapeMismatch {
                expected: self.label_count(),
                actual: values.len(),
            })?;
        series.set(PRESENCE_VALUE);
        Ok(())
    }

    /// Snapshot of the whole family, ready for pushing
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Number of distinct label combinations recorded so far
    pub fn series_count(&self) -> usize {
        self.gather()
            .iter()
            .map(|mf| mf.get_metric().len())
            .sum()
    }

    /// Encode the current family in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        encode_families(&self.gather())
    }
}

/// Encode metric families in Prometheus text exposition format
pub fn encode_families(families: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer).map_err(|e| {
        let metric_names: Vec<_> = families.iter().map(|mf| mf.name()).collect();

        tracing::error!(
            error = %e,
            metric_names = ?metric_names,
            "Prometheus text encoder failed"
        );

        prometheus::Error::Msg(format!(
            "Failed to encode {} metric families: {}",
            families.len(),
            e
        ))
    })?;

    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!(
            "Failed to convert metrics to UTF-8 at byte {}: {}",
            e.utf8_error().valid_up_to(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn region_device_gauge() -> PresenceGauge {
        let definition = MetricDefinition::new(
            "inventory_presence",
            "Presence of an inventory item",
            labels(&["region", "device"]),
        )
        .expect("definition should be valid");
        PresenceGauge::new(definition).expect("gauge should register")
    }

    #[test]
    fn test_definition_rejects_duplicate_labels() {
        let result = MetricDefinition::new("m", "h", labels(&["region", "region"]));
        match result {
            Err(AppError::InvalidSchema { metric, reason }) => {
                assert_eq!(metric, "m");
                assert!(reason.contains("region"));
            }
            other => panic!("expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_definition_preserves_label_order() {
        let definition =
            MetricDefinition::new("m", "h", labels(&["b", "a", "c"])).expect("valid definition");
        assert_eq!(definition.label_names(), &["b", "a", "c"]);
    }

    #[test]
    fn test_invalid_metric_name_rejected() {
        let definition = MetricDefinition::new("not a metric", "h", labels(&["region"]))
            .expect("definition does not check identifiers");
        let result = PresenceGauge::new(definition);
        assert!(matches!(result, Err(AppError::InvalidSchema { .. })));
    }

    #[test]
    fn test_invalid_label_name_rejected() {
        let definition = MetricDefinition::new("m", "h", labels(&["device id"]))
            .expect("definition does not check identifiers");
        let result = PresenceGauge::new(definition);
        assert!(matches!(result, Err(AppError::InvalidSchema { .. })));
    }

    #[test]
    fn test_empty_help_is_exposed_blank() {
        let definition = MetricDefinition::new("inventory_presence", "", labels(&["region"]))
            .expect("valid definition");
        let gauge = PresenceGauge::new(definition).expect("empty help should not fail");
        assert_eq!(gauge.definition().help(), "");

        gauge.mark_present(&["us-east"]).expect("should set series");
        let output = gauge.encode_text().expect("should encode");
        assert!(
            output
                .lines()
                .any(|l| l.trim_end() == "# HELP inventory_presence"),
            "got: {}",
            output
        );
        assert!(!output.contains("# HELP inventory_presence inventory_presence"));
    }

    #[test]
    fn test_mark_present_sets_value_one() {
        let gauge = region_device_gauge();
        gauge
            .mark_present(&["us-east", "router1"])
            .expect("should set series");

        let output = gauge.encode_text().expect("should encode");
        assert!(output.contains("# TYPE inventory_presence gauge"));
        assert!(output.contains("region=\"us-east\""));
        assert!(output.contains("device=\"router1\""));
        assert!(output.lines().any(|l| l.starts_with("inventory_presence{") && l.ends_with(" 1")));
    }

    #[test]
    fn test_mark_present_rejects_wrong_length_without_mutation() {
        let gauge = region_device_gauge();
        let err = gauge
            .mark_present(&["us-east", "router1", "extra"])
            .unwrap_err();
        assert_eq!(
            err,
            PublishError::RowShapeMismatch {
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(gauge.series_count(), 0);
    }

    #[test]
    fn test_series_accumulate_and_never_removed() {
        let gauge = region_device_gauge();
        gauge.mark_present(&["us-east", "router1"]).unwrap();
        gauge.mark_present(&["us-west", "router2"]).unwrap();
        gauge.mark_present(&["us-east", "router1"]).unwrap();

        assert_eq!(gauge.series_count(), 2);
        let output = gauge.encode_text().unwrap();
        assert!(output.contains("region=\"us-west\""));
        assert!(output.contains("region=\"us-east\""));
    }

    #[test]
    fn test_gauges_do_not_share_registries() {
        let first = region_device_gauge();
        let second = region_device_gauge();
        first.mark_present(&["us-east", "router1"]).unwrap();

        assert_eq!(first.series_count(), 1);
        assert_eq!(second.series_count(), 0);
    }

    #[test]
    fn test_label_values_with_quotes_are_escaped() {
        let gauge = region_device_gauge();
        gauge.mark_present(&["us \"east\"", "router1"]).unwrap();
        let output = gauge.encode_text().unwrap();
        assert!(output.contains(r#"region="us \"east\"""#), "got: {}", output);
    }
}
