//! Template rendering for chart manifests.
//!
//! Supports value references (`{{ .Values.a.b }}`), release and chart
//! fields, and an optional `| quote`. Anything else is rejected.

use crate::chart::Chart;
use crate::core::{RudderError, RudderResult};
use serde_json::{Map, Value};

/// Release identity visible to templates
#[derive(Debug, Clone, Copy)]
pub struct ReleaseContext<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
}

/// Render a chart and its dependencies into one YAML stream.
///
/// `values` are merged over the chart defaults. A dependency sees its own
/// defaults merged with the parent's `<dependency name>` value.
pub fn render_chart(
    chart: &Chart,
    values: &Map<String, Value>,
    release: ReleaseContext<'_>,
) -> RudderResult<String> {
    let mut merged = chart.values.clone();
    for (key, value) in values {
        merged.insert(key.clone(), value.clone());
    }

    let mut out = String::new();
    for template in &chart.templates {
        if !is_manifest(&template.name) {
            continue;
        }
        let rendered = render_template(&template.data, chart, &merged, release)
            .map_err(|e| e.context(format!("render {}/{}", chart.name(), template.name)))?;
        if rendered.trim().is_empty() {
            continue;
        }
        out.push_str(&format!("---\n# Source: {}/{}\n", chart.name(), template.name));
        out.push_str(&rendered);
        if !rendered.ends_with('\n') {
            out.push('\n');
        }
    }

    for dependency in &chart.dependencies {
        let overrides = match merged.get(dependency.name()) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        out.push_str(&render_chart(dependency, &overrides, release)?);
    }

    Ok(out)
}

fn is_manifest(name: &str) -> bool {
    let file = name.rsplit('/').next().unwrap_or(name);
    !file.starts_with('_') && (file.ends_with(".yaml") || file.ends_with(".yml"))
}

fn render_template(
    source: &str,
    chart: &Chart,
    values: &Map<String, Value>,
    release: ReleaseContext<'_>,
) -> RudderResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| RudderError::Validation("unclosed template action".to_string()))?;
        let action = after[..end].trim().trim_start_matches('-').trim_end_matches('-');
        out.push_str(&evaluate(action.trim(), chart, values, release)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn evaluate(
    action: &str,
    chart: &Chart,
    values: &Map<String, Value>,
    release: ReleaseContext<'_>,
) -> RudderResult<String> {
    let mut parts = action.split('|').map(str::trim);
    let path = parts.next().unwrap_or_default();
    let quote = match parts.next() {
        None => false,
        Some("quote") => true,
        Some(other) => {
            return Err(RudderError::Validation(format!(
                "unsupported template function '{}'",
                other
            )))
        }
    };
    if parts.next().is_some() {
        return Err(RudderError::Validation(format!(
            "unsupported template pipeline '{}'",
            action
        )));
    }

    let text = match path {
        ".Release.Name" => release.name.to_string(),
        ".Release.Namespace" => release.namespace.to_string(),
        ".Chart.Name" => chart.name().to_string(),
        ".Chart.Version" => chart.version().to_string(),
        _ => match path.strip_prefix(".Values") {
            Some(keys) => lookup(values, keys).map(format_value).unwrap_or_default(),
            None => {
                return Err(RudderError::Validation(format!(
                    "unsupported template action '{}'",
                    action
                )))
            }
        },
    };

    if quote {
        Ok(serde_json::to_string(&text)?)
    } else {
        Ok(text)
    }
}

/// Resolve `.a.b.c` against `values`.
fn lookup<'a>(values: &'a Map<String, Value>, keys: &str) -> Option<&'a Value> {
    let mut keys = keys.split('.').filter(|k| !k.is_empty());
    let mut current = values.get(keys.next()?)?;
    for key in keys {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
