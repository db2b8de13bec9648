//! Unpacked chart archives.

mod archive;

pub use archive::load_archive;

use crate::core::{RudderError, RudderResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CHART_FILE_NAME: &str = "Chart.yaml";
pub const VALUES_FILE_NAME: &str = "values.yaml";
pub const SCHEMA_FILE_NAME: &str = "values.schema.json";

/// Chart.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMetadata {
    #[serde(rename = "apiVersion", default)]
    pub api_version: String,

    pub name: String,

    pub version: String,

    #[serde(default)]
    pub description: String,

    /// `application` (also when empty) or `library`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// A file carried by a chart, path relative to the chart root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub metadata: ChartMetadata,
    /// Default values, overridden by install options
    pub values: serde_json::Map<String, serde_json::Value>,
    pub templates: Vec<ChartFile>,
    /// Top-level files (Chart.yaml, values.yaml, README, ...)
    pub raw: Vec<ChartFile>,
    pub schema: Option<serde_json::Value>,
    pub dependencies: Vec<Chart>,
}

impl Chart {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    pub fn raw_file(&self, name: &str) -> Option<&ChartFile> {
        self.raw.iter().find(|f| f.name == name)
    }

    pub fn add_dependency(&mut self, chart: Chart) {
        self.dependencies.push(chart);
    }
}

/// Reject charts that cannot be deployed on their own.
pub fn is_installable(chart: &Chart) -> RudderResult<()> {
    match chart.metadata.chart_type.as_deref() {
        None | Some("") | Some("application") => Ok(()),
        Some(other) => Err(RudderError::Validation(format!(
            "{} charts are not installable",
            other
        ))),
    }
}
