//! Overlay patches for rendered resources.
//!
//! A patch is a partial document: mappings merge key by key, anything else
//! replaces the value it lands on.

use crate::catalog::annotation::{
    PLUGIN_ID_LABEL, SIDECAR_APP_ID, SIDECAR_APP_PORT, SIDECAR_CONFIG, SIDECAR_ENABLED,
};
use serde_yaml::{Mapping, Value};

/// Merge `patch` into `base`.
pub fn merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Mapping(base), Value::Mapping(patch)) => {
            for (key, value) in patch {
                match base.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// `metadata.<field>` and, for pod-owning resources, the same field on
/// `spec.template.metadata`.
fn metadata_patch(field: &str, values: Mapping, pod_template: bool) -> Value {
    let metadata = mapping([(field, Value::Mapping(values))]);
    let mut patch = mapping([("metadata", metadata.clone())]);
    if pod_template {
        let spec = mapping([("template", mapping([("metadata", metadata)]))]);
        if let Value::Mapping(m) = &mut patch {
            m.insert(Value::from("spec"), spec);
        }
    }
    patch
}

/// Ownership label naming the plugin instance.
pub fn ownership_patch(plugin_id: &str, pod_template: bool) -> Value {
    let mut labels = Mapping::new();
    labels.insert(Value::from(PLUGIN_ID_LABEL), Value::from(plugin_id));
    metadata_patch("labels", labels, pod_template)
}

/// Sidecar enablement annotations on the workload and its pods.
pub fn sidecar_patch(plugin_id: &str, port: &str) -> Value {
    let mut annotations = Mapping::new();
    for (key, value) in [
        (SIDECAR_ENABLED, "true"),
        (SIDECAR_APP_ID, plugin_id),
        (SIDECAR_APP_PORT, port),
        (SIDECAR_CONFIG, plugin_id),
    ] {
        annotations.insert(Value::from(key), Value::from(value));
    }
    metadata_patch("annotations", annotations, true)
}

fn mapping<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    let mut m = Mapping::new();
    for (k, v) in pairs {
        m.insert(Value::from(k), v);
    }
    Value::Mapping(m)
}
