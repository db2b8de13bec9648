//! Plugin installers.
//!
//! An [`Installer`] is one installable (or installed) instance of a catalog
//! entry. It carries the chart, the option values a caller configured, and
//! the descriptive annotations surfaced to users. Installing attaches the
//! platform component chart and runs the manifests through a
//! [`SidecarInjector`] before handing them to the deployment target.

pub mod component;

pub use component::ComponentSource;

use crate::catalog::annotation::{
    bool_or, non_empty, DEPLOYMENT_NAME_KEY, ENABLE_KEY, PLUGIN_PORT_KEY, SIDECAR_PREFIX,
};
use crate::chart::{is_installable, Chart, CHART_FILE_NAME, VALUES_FILE_NAME};
use crate::core::repository::{
    CHART_DESC_KEY, CONFIGURATION_KEY, CONFIGURATION_SCHEMA_KEY, README_KEY,
};
use crate::core::{
    Annotations, InstallOption, InstallerBrief, ResultExt, RudderError, RudderResult,
};
use crate::deploy::{Release, ReleaseRequest};
use crate::di::DeploymentTarget;
use crate::postrender::{PostRenderer, SidecarInjector, SidecarTarget};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Value naming the sidecar configuration when no sidecar is injected
pub const SIDECAR_CONFIG_VALUE: &str = "daprConfig";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerState {
    Constructed,
    Configured,
    Installed,
    Uninstalled,
}

impl fmt::Display for InstallerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallerState::Constructed => "constructed",
            InstallerState::Configured => "configured",
            InstallerState::Installed => "installed",
            InstallerState::Uninstalled => "uninstalled",
        };
        write!(f, "{}", s)
    }
}

pub struct Installer {
    chart: Option<Chart>,
    options: Map<String, Value>,
    annotations: Annotations,
    brief: InstallerBrief,
    id: String,
    namespace: String,
    state: InstallerState,
    target: Arc<dyn DeploymentTarget>,
    component: Arc<ComponentSource>,
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("id", &self.id)
            .field("brief", &self.brief)
            .field("namespace", &self.namespace)
            .field("state", &self.state)
            .finish()
    }
}

impl Installer {
    /// An installer for a freshly fetched chart.
    pub fn new(
        id: impl Into<String>,
        chart: Chart,
        brief: InstallerBrief,
        namespace: impl Into<String>,
        target: Arc<dyn DeploymentTarget>,
        component: Arc<ComponentSource>,
    ) -> Self {
        let annotations = chart_annotations(&chart);
        Self {
            options: chart.values.clone(),
            chart: Some(chart),
            annotations,
            brief,
            id: id.into(),
            namespace: namespace.into(),
            state: InstallerState::Constructed,
            target,
            component,
        }
    }

    /// An installer standing for an already deployed release; it carries
    /// no chart and can only be uninstalled.
    pub fn deployed(
        id: impl Into<String>,
        brief: InstallerBrief,
        namespace: impl Into<String>,
        target: Arc<dyn DeploymentTarget>,
        component: Arc<ComponentSource>,
    ) -> Self {
        Self {
            chart: None,
            options: Map::new(),
            annotations: Annotations::new(),
            brief,
            id: id.into(),
            namespace: namespace.into(),
            state: InstallerState::Installed,
            target,
            component,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn brief(&self) -> &InstallerBrief {
        &self.brief
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn state(&self) -> InstallerState {
        self.state
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current option values, sorted by key
    pub fn options(&self) -> Vec<InstallOption> {
        self.options
            .iter()
            .map(|(k, v)| InstallOption::new(k.clone(), v.clone()))
            .collect()
    }

    /// Override option values.
    ///
    /// Every option is checked before any is applied: keys must be among the
    /// chart's default values, and the instance must not be installed yet.
    pub fn set_options(&mut self, options: &[InstallOption]) -> RudderResult<()> {
        if matches!(
            self.state,
            InstallerState::Installed | InstallerState::Uninstalled
        ) {
            return Err(RudderError::Validation(format!(
                "installer {} is already {}",
                self.id, self.state
            )));
        }
        self.check_options(options)?;
        for option in options {
            self.options.insert(option.key.clone(), option.value.clone());
        }
        self.state = InstallerState::Configured;
        Ok(())
    }

    fn check_options(&self, options: &[InstallOption]) -> RudderResult<()> {
        let defaults = self.chart.as_ref().map(|c| &c.values);
        for option in options {
            option.validate()?;
            if !defaults.map_or(false, |d| d.contains_key(&option.key)) {
                return Err(RudderError::Validation(format!(
                    "unknown option '{}' for {}",
                    option.key, self.brief.name
                )));
            }
        }
        Ok(())
    }

    /// Deploy the chart under this installer's id.
    pub async fn install(&mut self, options: &[InstallOption]) -> RudderResult<Release> {
        if self.state != InstallerState::Constructed && self.state != InstallerState::Configured {
            return Err(RudderError::Validation(format!(
                "installer {} is already {}",
                self.id, self.state
            )));
        }
        self.check_options(options)?;
        let mut values = self.options.clone();
        for option in options {
            values.insert(option.key.clone(), option.value.clone());
        }

        let mut chart = self.chart.clone().ok_or_else(|| {
            RudderError::Validation(format!("installer {} has no chart", self.id))
        })?;
        is_installable(&chart)?;
        if chart.metadata.deprecated {
            warn!("Chart {} {} is deprecated", chart.name(), chart.version());
        }

        let component = self
            .component
            .load(&self.id)
            .await
            .context("load component chart")?;
        chart.add_dependency(component);

        let post_renderer = self.post_renderer(&chart, &mut values)?;
        let request = ReleaseRequest {
            chart,
            namespace: self.namespace.clone(),
            name: self.id.clone(),
            values,
            repo: self.brief.repo.clone(),
            post_renderer: Some(post_renderer),
        };

        let release = self
            .target
            .install(request)
            .await
            .with_context(|| format!("install {} as {}", self.brief, self.id))?;
        self.state = InstallerState::Installed;
        info!("Installed {} as {}", self.brief, self.id);
        Ok(release)
    }

    /// Labelling always; the sidecar only when the chart opts in.
    fn post_renderer(
        &self,
        chart: &Chart,
        values: &mut Map<String, Value>,
    ) -> RudderResult<Arc<dyn PostRenderer>> {
        let annotations = &chart.metadata.annotations;
        if !bool_or(annotations, ENABLE_KEY, false) {
            debug!("Sidecar disabled for {}", self.id);
            values.insert(SIDECAR_CONFIG_VALUE.to_string(), Value::from(self.id.as_str()));
            return Ok(Arc::new(SidecarInjector::labels_only(self.id.as_str())));
        }

        let required = |key: &str| {
            non_empty(annotations, key).map(String::from).ok_or_else(|| {
                RudderError::Validation(format!(
                    "chart {} enables the sidecar but has no '{}' annotation",
                    chart.name(),
                    key
                ))
            })
        };
        let target = SidecarTarget {
            deployment: required(DEPLOYMENT_NAME_KEY)?,
            port: required(PLUGIN_PORT_KEY)?,
        };
        Ok(Arc::new(SidecarInjector::with_sidecar(
            self.id.as_str(),
            target,
        )))
    }

    /// Remove the deployed release named by this installer's id.
    pub async fn uninstall(&mut self) -> RudderResult<Release> {
        let release = self
            .target
            .uninstall(&self.id)
            .await
            .with_context(|| format!("uninstall {}", self.id))?;
        self.state = InstallerState::Uninstalled;
        info!("Uninstalled {}", self.id);
        Ok(release)
    }
}

fn chart_annotations(chart: &Chart) -> Annotations {
    let mut annotations = Annotations::new();
    for file in &chart.raw {
        let key = if file.name.to_ascii_lowercase().starts_with("readme") {
            README_KEY
        } else if file.name == VALUES_FILE_NAME {
            CONFIGURATION_KEY
        } else if file.name == CHART_FILE_NAME {
            CHART_DESC_KEY
        } else {
            continue;
        };
        annotations.insert(key.to_string(), Value::from(file.data.as_str()));
    }
    if let Some(schema) = &chart.schema {
        annotations.insert(CONFIGURATION_SCHEMA_KEY.to_string(), schema.clone());
    }
    for (k, v) in &chart.metadata.annotations {
        if !k.starts_with(SIDECAR_PREFIX) {
            annotations.insert(k.clone(), Value::from(v.as_str()));
        }
    }
    annotations
}
