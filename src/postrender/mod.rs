//! Post-processing of rendered manifests.
//!
//! [`SidecarInjector`] labels every resource with the owning plugin
//! instance and, for the one workload that hosts the sidecar, adds the
//! sidecar annotations. A document that fails to decode aborts the whole
//! stream, so a partially labelled manifest set is never applied.

pub mod overlay;

use crate::core::{ResultExt, RudderError, RudderResult};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt::Debug;

/// Transform applied to a rendered multi-document YAML stream
pub trait PostRenderer: Send + Sync + Debug {
    fn run(&self, manifests: &str) -> RudderResult<String>;
}

/// The workload that receives the sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarTarget {
    pub deployment: String,
    pub port: String,
}

#[derive(Debug, Clone)]
pub struct SidecarInjector {
    plugin_id: String,
    sidecar: Option<SidecarTarget>,
}

impl SidecarInjector {
    /// Ownership labelling only
    pub fn labels_only(plugin_id: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            sidecar: None,
        }
    }

    pub fn with_sidecar(plugin_id: impl Into<String>, target: SidecarTarget) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            sidecar: Some(target),
        }
    }

    pub fn sidecar(&self) -> Option<&SidecarTarget> {
        self.sidecar.as_ref()
    }

    fn is_target(&self, doc: &Value) -> bool {
        let Some(target) = &self.sidecar else {
            return false;
        };
        doc["kind"].as_str() == Some("Deployment")
            && doc["metadata"]["name"].as_str() == Some(target.deployment.as_str())
    }

    fn transform(&self, mut doc: Value) -> Value {
        let pod_template = doc["spec"]["template"].is_mapping();
        overlay::merge(
            &mut doc,
            &overlay::ownership_patch(&self.plugin_id, pod_template),
        );
        if self.is_target(&doc) {
            if let Some(target) = &self.sidecar {
                overlay::merge(&mut doc, &overlay::sidecar_patch(&self.plugin_id, &target.port));
            }
        }
        doc
    }
}

impl PostRenderer for SidecarInjector {
    fn run(&self, manifests: &str) -> RudderResult<String> {
        let mut out = String::new();
        if manifests.trim().is_empty() {
            return Ok(out);
        }
        for (i, document) in serde_yaml::Deserializer::from_str(manifests).enumerate() {
            let doc = Value::deserialize(document)
                .with_context(|| format!("post-render: decode document {}", i))?;
            out.push_str("---\n");
            match doc {
                Value::Null => {}
                Value::Mapping(_) => {
                    out.push_str(&serde_yaml::to_string(&self.transform(doc))?);
                }
                _ => {
                    return Err(RudderError::Validation(format!(
                        "post-render: document {} is not a mapping",
                        i
                    )))
                }
            }
        }
        Ok(out)
    }
}

/// Number of documents in a stream, empty ones included
pub fn count_documents(manifests: &str) -> usize {
    serde_yaml::Deserializer::from_str(manifests).count()
}
