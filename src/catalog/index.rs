use super::annotation::ENABLE_KEY;
use crate::core::{InstallerBrief, ResultExt, RudderError, RudderResult};
use crate::di::ArtifactFetcher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Catalog document name under a repository base URL
pub const INDEX_FILE_NAME: &str = "index.yaml";

/// apiVersion given to entries that do not declare one
pub const DEFAULT_ENTRY_API_VERSION: &str = "v1";

pub fn index_url(base: &str) -> String {
    resolve_url(base, INDEX_FILE_NAME)
}

/// Absolute URLs pass through; anything else is joined onto `base`.
pub fn resolve_url(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

/// One version of one package in a catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub name: String,
    pub version: String,
    pub urls: Vec<String>,
    pub description: String,
    pub annotations: BTreeMap<String, String>,
    /// Hex SHA-256 of the chart archive
    pub digest: Option<String>,
    pub api_version: String,
    pub chart_type: Option<String>,
    pub deprecated: bool,
    pub created: Option<String>,
}

impl Entry {
    pub fn is_enabled(&self) -> bool {
        self.annotations.contains_key(ENABLE_KEY)
    }

    /// Search summary; `installed` is left false for the caller to set.
    pub fn brief(&self, repo: &str) -> InstallerBrief {
        InstallerBrief {
            name: self.name.clone(),
            repo: repo.to_string(),
            version: self.version.clone(),
            installed: false,
            description: self.description.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawIndexFile {
    #[serde(rename = "apiVersion")]
    api_version: Option<String>,
    generated: Option<String>,
    #[serde(default)]
    entries: BTreeMap<String, Vec<serde_yaml::Value>>,
}

#[derive(Deserialize)]
struct RawEntry {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    urls: Vec<String>,
    description: Option<String>,
    annotations: Option<BTreeMap<String, serde_yaml::Value>>,
    digest: Option<String>,
    #[serde(rename = "apiVersion")]
    api_version: Option<String>,
    #[serde(rename = "type")]
    chart_type: Option<String>,
    #[serde(default)]
    deprecated: bool,
    created: Option<String>,
}

impl RawEntry {
    fn into_entry(self, package: &str) -> Result<Entry, String> {
        let name = self.name.filter(|n| !n.is_empty()).ok_or("missing name")?;
        if name != package {
            return Err(format!("entry name '{}' differs from its chart", name));
        }
        let version = self
            .version
            .filter(|v| !v.is_empty())
            .ok_or("missing version")?;
        if !is_path_safe(&name) || !is_path_safe(&version) {
            return Err(format!("unsafe name or version '{}-{}'", name, version));
        }
        if self.urls.is_empty() {
            return Err("no download urls".to_string());
        }
        let description = self.description.ok_or("missing description")?;
        let annotations = self
            .annotations
            .ok_or("missing annotations")?
            .into_iter()
            .map(|(k, v)| scalar_to_string(&v).map(|v| (k.clone(), v)).ok_or(k))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(|k| format!("annotation '{}' is not a scalar", k))?;

        Ok(Entry {
            name,
            version,
            urls: self.urls,
            description,
            annotations,
            digest: self.digest.filter(|d| !d.is_empty()),
            api_version: self
                .api_version
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_ENTRY_API_VERSION.to_string()),
            chart_type: self.chart_type.filter(|t| !t.is_empty()),
            deprecated: self.deprecated,
            created: self.created,
        })
    }
}

/// True when `part` can be used as a single file name component.
pub fn is_path_safe(part: &str) -> bool {
    !part.is_empty() && !part.contains(['/', '\\']) && !part.contains("..")
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        _ => None,
    }
}

/// A parsed catalog document
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFile {
    pub api_version: String,
    pub generated: Option<DateTime<Utc>>,
    /// package name → entries, newest version first
    pub entries: BTreeMap<String, Vec<Entry>>,
}

impl IndexFile {
    /// Parse a catalog document.
    ///
    /// Invalid entries are dropped with a warning. A document without a
    /// top-level `apiVersion` is rejected.
    pub fn parse(data: &[u8]) -> RudderResult<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(RudderError::Validation("index document is empty".to_string()));
        }
        let raw: RawIndexFile =
            serde_yaml::from_slice(data).context("Failed to parse index document")?;
        let api_version = raw.api_version.filter(|v| !v.is_empty()).ok_or_else(|| {
            RudderError::Validation("index document has no apiVersion".to_string())
        })?;

        let generated = raw.generated.and_then(|g| match DateTime::parse_from_rfc3339(&g) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring unparseable index timestamp {:?}: {}", g, e);
                None
            }
        });

        let mut entries = BTreeMap::new();
        for (package, values) in raw.entries {
            let mut valid: Vec<Entry> = Vec::with_capacity(values.len());
            for value in values {
                let parsed = serde_yaml::from_value::<RawEntry>(value)
                    .map_err(|e| e.to_string())
                    .and_then(|raw| raw.into_entry(&package));
                match parsed {
                    Ok(entry) => valid.push(entry),
                    Err(reason) => {
                        warn!("Skipping invalid entry for chart {:?}: {}", package, reason)
                    }
                }
            }
            valid.sort_by(|a, b| compare_versions(&b.version, &a.version));
            entries.insert(package, valid);
        }

        Ok(Self {
            api_version,
            generated,
            entries,
        })
    }
}

/// Semver order where both sides parse, string order otherwise.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| semver::Version::parse(v.trim_start_matches('v')).ok();
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[derive(Debug, Default)]
struct IndexState {
    generated: Option<DateTime<Utc>>,
    packages: BTreeMap<String, BTreeMap<String, Entry>>,
}

/// Queryable listing of one repository's catalog
///
/// Searches share the lock; a refresh holds it exclusively while merging.
/// The catalog document is always fetched before the lock is taken.
#[derive(Debug)]
pub struct Index {
    repo: String,
    url: String,
    state: RwLock<IndexState>,
}

impl Index {
    pub fn from_file(repo: impl Into<String>, url: impl Into<String>, file: IndexFile) -> Self {
        let index = Self {
            repo: repo.into(),
            url: url.into(),
            state: RwLock::new(IndexState::default()),
        };
        index.apply(file);
        index
    }

    /// Fetch and parse the catalog of the repository at `url`.
    pub async fn load(
        repo: &str,
        url: &str,
        fetcher: &dyn ArtifactFetcher,
    ) -> RudderResult<Self> {
        let file = fetch_file(url, fetcher).await?;
        debug!(
            "Loaded index of '{}': {} package(s)",
            repo,
            file.entries.len()
        );
        Ok(Self::from_file(repo, url, file))
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn generated(&self) -> Option<DateTime<Utc>> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).generated
    }

    /// Number of packages
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .packages
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enabled entries matching `word`, packages by name and versions newest
    /// first.
    ///
    /// `"*"` matches every package; any other word must equal the package
    /// name. A given `version` must match exactly.
    pub fn search(&self, word: &str, version: Option<&str>) -> Vec<Entry> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let mut found = Vec::new();
        for (name, versions) in &state.packages {
            if word != "*" && name != word {
                continue;
            }
            let mut matched: Vec<&Entry> = versions
                .values()
                .filter(|e| version.map_or(true, |v| e.version == v))
                .filter(|e| e.is_enabled())
                .collect();
            matched.sort_by(|a, b| compare_versions(&b.version, &a.version));
            found.extend(matched.into_iter().cloned());
        }
        found
    }

    /// Merge `file` in and drop every package/version it does not list.
    ///
    /// Returns whether the content or the generation changed.
    pub fn apply(&self, file: IndexFile) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let mut changed = false;

        if file.generated > state.generated {
            state.generated = file.generated;
            changed = true;
        }

        for (name, entries) in &file.entries {
            if entries.is_empty() {
                continue;
            }
            let versions = state.packages.entry(name.clone()).or_default();
            for entry in entries {
                if versions.get(&entry.version) != Some(entry) {
                    versions.insert(entry.version.clone(), entry.clone());
                    changed = true;
                }
            }
        }

        state.packages.retain(|name, versions| {
            let Some(listed) = file.entries.get(name) else {
                changed = true;
                return false;
            };
            versions.retain(|version, _| {
                let keep = listed.iter().any(|e| &e.version == version);
                changed |= !keep;
                keep
            });
            !versions.is_empty()
        });

        changed
    }

    /// Re-fetch the catalog and apply it.
    pub async fn refresh(&self, fetcher: &dyn ArtifactFetcher) -> RudderResult<bool> {
        let file = fetch_file(&self.url, fetcher).await?;
        Ok(self.apply(file))
    }
}

async fn fetch_file(url: &str, fetcher: &dyn ArtifactFetcher) -> RudderResult<IndexFile> {
    let url = index_url(url);
    let data = fetcher
        .fetch(&url)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    IndexFile::parse(&data).with_context(|| format!("Invalid index {}", url))
}
