use crate::catalog::{fetch_first, index_url, IndexFile};
use crate::chart::{is_installable, load_archive, Chart};
use crate::core::{ResultExt, RudderError, RudderResult};
use crate::di::ArtifactFetcher;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Value carrying the plugin instance id on the component chart
pub const PLUGIN_ID_VALUE: &str = "pluginID";

/// Value carrying the platform secret on the component chart
pub const SECRET_VALUE: &str = "secret";

/// Where the mandatory component chart comes from
pub struct ComponentSource {
    repo_url: String,
    chart_name: String,
    secret: String,
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl ComponentSource {
    pub fn new(
        repo_url: impl Into<String>,
        chart_name: impl Into<String>,
        secret: impl Into<String>,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            chart_name: chart_name.into(),
            secret: secret.into(),
            fetcher,
        }
    }

    pub fn chart_name(&self) -> &str {
        &self.chart_name
    }

    /// Fetch the latest component chart and wire it to `plugin_id`.
    pub async fn load(&self, plugin_id: &str) -> RudderResult<Chart> {
        let url = index_url(&self.repo_url);
        let data = self
            .fetcher
            .fetch(&url)
            .await
            .with_context(|| format!("Failed to fetch component index {}", url))?;
        let index = IndexFile::parse(&data)?;
        let entry = index
            .entries
            .get(&self.chart_name)
            .and_then(|versions| versions.first())
            .ok_or_else(|| {
                RudderError::NotFound(format!(
                    "chart {} in {}",
                    self.chart_name, self.repo_url
                ))
            })?;
        debug!("Component chart {} {}", entry.name, entry.version);

        let archive = fetch_first(
            self.fetcher.as_ref(),
            &self.repo_url,
            &entry.urls,
            entry.digest.as_deref(),
        )
        .await?;
        let mut chart = load_archive(&archive)
            .with_context(|| format!("Failed to load component chart {}", entry.name))?;
        is_installable(&chart)?;
        if chart.metadata.deprecated {
            warn!("Component chart {} is deprecated", chart.name());
        }

        self.wire(&mut chart, plugin_id);
        Ok(chart)
    }

    fn wire(&self, chart: &mut Chart, plugin_id: &str) {
        chart
            .values
            .insert(PLUGIN_ID_VALUE.to_string(), Value::from(plugin_id));
        chart
            .values
            .insert(SECRET_VALUE.to_string(), Value::from(self.secret.as_str()));
    }
}
