//! Bridge configuration.

use crate::bridge::{ContextBridge, FieldNames};
use otelog_core::{Level, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bridge configuration, usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Names of the fields written to enriched records.
    #[serde(default)]
    pub field_names: FieldNames,
    /// Write the sampled flag as a field.
    #[serde(default)]
    pub include_sampled: bool,
    /// Sink receiving log records and forwarded span events.
    #[serde(default = "default_sink_name")]
    pub sink_name: String,
    /// Forward span events to the sink when spans end.
    #[serde(default = "default_forward_span_events")]
    pub forward_span_events: bool,
    /// Logger name of records converted from span events.
    #[serde(default = "default_logger_name")]
    pub logger_name: String,
    /// Level of span events without a `level` attribute.
    #[serde(default)]
    pub default_level: Level,
    /// Filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// `service.name` resource attribute.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Also print human-readable output to stderr.
    #[serde(default)]
    pub console: bool,
}

fn default_sink_name() -> String {
    "stdout".to_string()
}

fn default_forward_span_events() -> bool {
    true
}

fn default_logger_name() -> String {
    "otelog".to_string()
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            field_names: FieldNames::default(),
            include_sampled: false,
            sink_name: default_sink_name(),
            forward_span_events: default_forward_span_events(),
            logger_name: default_logger_name(),
            default_level: Level::default(),
            filter: default_filter(),
            service_name: default_service_name(),
            console: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build a context bridge with the configured field names.
    pub fn bridge(&self) -> ContextBridge {
        ContextBridge::new(self.field_names.clone()).with_sampled(self.include_sampled)
    }
}
