use super::{Chart, ChartFile, ChartMetadata, CHART_FILE_NAME, SCHEMA_FILE_NAME, VALUES_FILE_NAME};
use crate::core::{ResultExt, RudderError, RudderResult};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;

/// Load a chart from a gzip tar archive.
///
/// Every path is taken relative to the archive's top directory. Nested
/// `charts/*.tgz` archives become dependencies.
pub fn load_archive(data: &[u8]) -> RudderResult<Chart> {
    let mut archive = Archive::new(GzDecoder::new(data));

    let mut chart_yaml = None;
    let mut values_yaml = None;
    let mut schema = None;
    let mut templates = Vec::new();
    let mut raw = Vec::new();
    let mut dependencies = Vec::new();

    for entry in archive.entries().context("Failed to read chart archive")? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_top_dir(&path) else {
            continue;
        };

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;

        if relative.starts_with("charts/") {
            if relative.ends_with(".tgz") {
                dependencies.push(
                    load_archive(&bytes)
                        .with_context(|| format!("Failed to load dependency {}", relative))?,
                );
            }
            continue;
        }

        let text = String::from_utf8(bytes).map_err(|_| {
            RudderError::Validation(format!("chart file {} is not UTF-8", relative))
        })?;

        if relative.starts_with("templates/") {
            templates.push(ChartFile {
                name: relative,
                data: text,
            });
            continue;
        }
        if relative.contains('/') {
            continue;
        }

        match relative.as_str() {
            CHART_FILE_NAME => chart_yaml = Some(text.clone()),
            VALUES_FILE_NAME => values_yaml = Some(text.clone()),
            SCHEMA_FILE_NAME => {
                schema = Some(
                    serde_json::from_str(&text).context("Invalid values.schema.json")?,
                )
            }
            _ => {}
        }
        raw.push(ChartFile {
            name: relative,
            data: text,
        });
    }

    let chart_yaml = chart_yaml.ok_or_else(|| {
        RudderError::Validation("chart archive has no Chart.yaml".to_string())
    })?;
    let metadata: ChartMetadata =
        serde_yaml::from_str(&chart_yaml).context("Invalid Chart.yaml")?;

    let values = match values_yaml {
        Some(text) => match serde_yaml::from_str::<serde_json::Value>(&text)
            .context("Invalid values.yaml")?
        {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            _ => {
                return Err(RudderError::Validation(
                    "values.yaml must be a mapping".to_string(),
                ))
            }
        },
        None => serde_json::Map::new(),
    };

    templates.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Chart {
        metadata,
        values,
        templates,
        raw,
        schema,
        dependencies,
    })
}

fn strip_top_dir(path: &Path) -> Option<String> {
    let mut components = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)));
    components.next()?;
    let rest: Vec<_> = components
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if rest.is_empty() {
        None
    } else {
        Some(rest.join("/"))
    }
}
