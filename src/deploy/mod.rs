//! Deployment targets.
//!
//! A target renders a chart, runs the request's post renderer over the
//! manifests, and records the resulting release. The [`Driver`] selects
//! where releases are kept.

pub mod filesystem;
pub mod memory;
pub mod render;

pub use filesystem::FilesystemTarget;
pub use memory::MemoryTarget;

use crate::chart::Chart;
use crate::core::{ResultExt, RudderError, RudderResult};
use crate::postrender::PostRenderer;
use chrono::{DateTime, Utc};
use render::{render_chart, ReleaseContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Release bookkeeping backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Memory,
    #[default]
    Filesystem,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Memory => write!(f, "memory"),
            Driver::Filesystem => write!(f, "filesystem"),
        }
    }
}

impl FromStr for Driver {
    type Err = RudderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Driver::Memory),
            "filesystem" => Ok(Driver::Filesystem),
            other => Err(RudderError::Config(format!("unknown driver '{}'", other))),
        }
    }
}

/// A deployed plugin instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Instance id
    pub name: String,
    pub namespace: String,
    /// Repository the chart came from
    pub repo: String,
    pub chart_name: String,
    pub chart_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub manifest: String,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub chart: Chart,
    pub namespace: String,
    /// Release name (the instance id)
    pub name: String,
    pub values: serde_json::Map<String, serde_json::Value>,
    pub repo: String,
    pub post_renderer: Option<Arc<dyn PostRenderer>>,
}

impl ReleaseRequest {
    /// Render the chart and run the post renderer.
    pub fn manifest(&self) -> RudderResult<String> {
        let rendered = render_chart(
            &self.chart,
            &self.values,
            ReleaseContext {
                name: &self.name,
                namespace: &self.namespace,
            },
        )?;
        match &self.post_renderer {
            Some(renderer) => renderer
                .run(&rendered)
                .with_context(|| format!("post-render release {}", self.name)),
            None => Ok(rendered),
        }
    }

    pub(crate) fn into_release(self, manifest: String) -> Release {
        Release {
            chart_name: self.chart.metadata.name,
            chart_version: self.chart.metadata.version,
            name: self.name,
            namespace: self.namespace,
            repo: self.repo,
            manifest,
            installed_at: Utc::now(),
        }
    }
}

pub(crate) fn check_namespace(target: &str, request: &ReleaseRequest) -> RudderResult<()> {
    if request.namespace != target {
        return Err(RudderError::Validation(format!(
            "release {} targets namespace '{}' but the driver manages '{}'",
            request.name, request.namespace, target
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::chart::{ChartFile, ChartMetadata};
    use std::collections::BTreeMap;

    pub fn request(name: &str, namespace: &str) -> ReleaseRequest {
        ReleaseRequest {
            chart: Chart {
                metadata: ChartMetadata {
                    api_version: "v2".to_string(),
                    name: "echo".to_string(),
                    version: "0.1.0".to_string(),
                    description: String::new(),
                    chart_type: None,
                    deprecated: false,
                    annotations: BTreeMap::new(),
                },
                values: serde_json::Map::new(),
                templates: vec![ChartFile {
                    name: "templates/svc.yaml".to_string(),
                    data: "kind: Service\nmetadata:\n  name: {{ .Release.Name }}\n".to_string(),
                }],
                raw: Vec::new(),
                schema: None,
                dependencies: Vec::new(),
            },
            namespace: namespace.to_string(),
            name: name.to_string(),
            values: serde_json::Map::new(),
            repo: "official".to_string(),
            post_renderer: None,
        }
    }
}
