use super::common::*;
use rudder::catalog::annotation::{PLUGIN_ID_LABEL, SIDECAR_APP_ID};
use rudder::core::{Info, InstallOption};
use rudder::di::{DeploymentTarget, InfoStore};
use serde_json::json;
use std::time::Duration;
use wiremock::MockServer;

#[tokio::test]
async fn test_add_search_install_uninstall() {
    let server = MockServer::start().await;
    serve_repositories(&server).await;
    let t = test_hub(&server);
    let hub = t.container.hub();

    let repo = hub
        .add(&Info::new("official", t.plugins_url.as_str()))
        .await
        .unwrap();
    let briefs = repo.search("*", None).await.unwrap();
    assert_eq!(briefs.len(), 1);
    assert!(!briefs[0].installed);

    let mut installer = repo.get("echo", None).await.unwrap();
    installer.set_id("echo-1");
    let release = installer
        .install(&[InstallOption::new("replicas", json!(3))])
        .await
        .unwrap();

    assert_eq!(release.namespace, NAMESPACE);
    assert!(release.manifest.contains("replicas: 3"));
    assert!(release.manifest.contains(PLUGIN_ID_LABEL));
    assert!(release.manifest.contains(SIDECAR_APP_ID));
    assert!(release.manifest.contains("echo-1-components"));
    assert!(release.manifest.contains("s3cret"));

    assert!(repo.search("echo", None).await.unwrap()[0].installed);

    let brief = installer.brief().clone();
    hub.uninstall("echo-1", &brief).await.unwrap();
    assert!(t.target.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_rejects_unreachable_repository() {
    let server = MockServer::start().await;
    serve_repositories(&server).await;
    let t = test_hub(&server);

    let info = Info::new("missing", format!("{}/nothing", server.uri()));
    assert!(t.container.hub().add(&info).await.is_err());
    assert!(t.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reconciles_external_store_writes() {
    let server = MockServer::start().await;
    serve_repositories(&server).await;
    let t = test_hub(&server);
    let hub = t.container.hub();

    let handle = hub.init(Duration::from_millis(20)).await.unwrap();
    assert!(hub.list().is_empty());

    t.store
        .create(&Info::new("official", t.plugins_url.as_str()))
        .await
        .unwrap();
    let mut published = false;
    for _ in 0..100 {
        if hub.list().len() == 1 {
            published = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(published);

    t.store.delete("official").await.unwrap();
    let mut removed = false;
    for _ in 0..100 {
        if hub.list().is_empty() {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(removed);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delete_then_uninstall_falls_back() {
    let server = MockServer::start().await;
    serve_repositories(&server).await;
    let t = test_hub(&server);
    let hub = t.container.hub();

    let repo = hub
        .add(&Info::new("official", t.plugins_url.as_str()))
        .await
        .unwrap();
    let mut installer = repo.get("echo", Some("0.1.0")).await.unwrap();
    installer.install(&[]).await.unwrap();
    let brief = installer.brief().clone();

    let removed = hub.delete("official").await.unwrap();
    removed.close().unwrap();

    let release = hub.uninstall("echo", &brief).await.unwrap();
    assert_eq!(release.name, "echo");
}
