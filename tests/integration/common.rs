//! Common utilities for integration tests

use flate2::write::GzEncoder;
use flate2::Compression;
use rudder::catalog::{digest_hex, HttpFetcher};
use rudder::config::Config;
use rudder::deploy::MemoryTarget;
use rudder::di::{InfoStore, ServiceContainer};
use rudder::store::{MemoryState, StateInfoStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const NAMESPACE: &str = "keel-system";

/// Gzip tar with every file under `<top>/`
pub fn chart_archive(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", top, name), data.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn echo_chart(version: &str) -> Vec<u8> {
    let chart_yaml = format!(
        "apiVersion: v2\nname: echo\nversion: {}\ndescription: echo plugin\nannotations:\n  tkeel.io/enable: \"true\"\n  tkeel.io/deployment-name: echo-1\n  tkeel.io/plugin-port: \"8080\"\n",
        version
    );
    chart_archive(
        "echo",
        &[
            ("Chart.yaml", chart_yaml.as_str()),
            ("values.yaml", "replicas: 1\n"),
            ("README.md", "# echo\n"),
            (
                "templates/deployment.yaml",
                "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {{ .Release.Name }}\n  namespace: {{ .Release.Namespace }}\nspec:\n  replicas: {{ .Values.replicas }}\n  template:\n    metadata:\n      labels:\n        app: echo\n",
            ),
            (
                "templates/service.yaml",
                "apiVersion: v1\nkind: Service\nmetadata:\n  name: {{ .Release.Name }}\n",
            ),
        ],
    )
}

fn component_chart() -> Vec<u8> {
    chart_archive(
        "tkeel-plugin-components",
        &[
            (
                "Chart.yaml",
                "apiVersion: v2\nname: tkeel-plugin-components\nversion: 0.1.0\n",
            ),
            ("values.yaml", "pluginID: \"\"\nsecret: \"\"\n"),
            (
                "templates/secret.yaml",
                "kind: Secret\nmetadata:\n  name: {{ .Values.pluginID }}-components\nstringData:\n  secret: {{ .Values.secret | quote }}\n",
            ),
        ],
    )
}

async fn serve(server: &MockServer, at: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serve a plugin catalog under `/plugins` and the component catalog
/// under `/components`.
pub async fn serve_repositories(server: &MockServer) {
    let echo = echo_chart("0.1.0");
    let index = format!(
        "apiVersion: v1\ngenerated: \"2022-01-10T08:00:00Z\"\nentries:\n  echo:\n    - name: echo\n      version: 0.1.0\n      description: echo plugin\n      digest: {}\n      urls: [\"charts/echo-0.1.0.tgz\"]\n      annotations:\n        tkeel.io/enable: \"true\"\n",
        digest_hex(&echo)
    );
    serve(server, "/plugins/index.yaml", index.into_bytes()).await;
    serve(server, "/plugins/charts/echo-0.1.0.tgz", echo).await;

    let components = "apiVersion: v1\nentries:\n  tkeel-plugin-components:\n    - name: tkeel-plugin-components\n      version: 0.1.0\n      description: platform wiring\n      urls: [\"tkeel-plugin-components-0.1.0.tgz\"]\n      annotations: {}\n";
    serve(server, "/components/index.yaml", components.as_bytes().to_vec()).await;
    serve(
        server,
        "/components/tkeel-plugin-components-0.1.0.tgz",
        component_chart(),
    )
    .await;
}

pub struct TestHub {
    pub container: ServiceContainer,
    pub store: Arc<StateInfoStore<MemoryState>>,
    pub target: Arc<MemoryTarget>,
    pub plugins_url: String,
    _temp: TempDir,
}

/// Services wired against `server`, records and releases kept in memory
pub fn test_hub(server: &MockServer) -> TestHub {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.component.repo_url = format!("{}/components", server.uri());
    config.component.secret = "s3cret".to_string();

    let store = Arc::new(StateInfoStore::new(MemoryState::new()));
    let target = Arc::new(MemoryTarget::new(NAMESPACE));
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(5)).unwrap());
    let container = ServiceContainer::with_providers(
        config,
        temp.path().to_path_buf(),
        store.clone() as Arc<dyn InfoStore>,
        fetcher,
        target.clone(),
    );

    TestHub {
        container,
        store,
        target,
        plugins_url: format!("{}/plugins", server.uri()),
        _temp: temp,
    }
}
