//! Reserved chart annotations and label keys.

use std::collections::BTreeMap;

/// Opts a chart into discoverability; when truthy also enables sidecar wiring
pub const ENABLE_KEY: &str = "tkeel.io/enable";

/// Name of the Deployment that hosts the sidecar
pub const DEPLOYMENT_NAME_KEY: &str = "tkeel.io/deployment-name";

/// Port the plugin listens on inside its pod
pub const PLUGIN_PORT_KEY: &str = "tkeel.io/plugin-port";

/// Ownership label set on every rendered resource
pub const PLUGIN_ID_LABEL: &str = "tkeel.io/plugin-id";

/// Chart annotations under this prefix are not surfaced on installers
pub const SIDECAR_PREFIX: &str = "dapr.io/";

pub const SIDECAR_ENABLED: &str = "dapr.io/enabled";
pub const SIDECAR_APP_ID: &str = "dapr.io/app-id";
pub const SIDECAR_APP_PORT: &str = "dapr.io/app-port";
pub const SIDECAR_CONFIG: &str = "dapr.io/config";

/// Read a boolean annotation: `y`, `yes`, `true`, `on` and `1` (any case)
/// are true, anything else is false, and a missing key yields `default`.
pub fn bool_or(annotations: &BTreeMap<String, String>, key: &str, default: bool) -> bool {
    match annotations.get(key) {
        Some(value) => is_truthy(value),
        None => default,
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "on" | "1"
    )
}

/// Non-empty string annotation
pub fn non_empty<'a>(annotations: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    annotations
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}
