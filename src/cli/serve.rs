use rudder::core::RudderResult;
use rudder::di::ServiceContainer;
use tracing::{info, warn};

/// Reconcile until Ctrl-C or a fatal watch error.
pub async fn run(container: ServiceContainer) -> RudderResult<()> {
    let hub = container.hub();
    let mut handle = hub.init(container.config().watch_interval()).await?;
    if let Some(e) = handle.startup_errors() {
        warn!("Some repositories failed to open: {}", e);
    }
    println!(
        "Serving {} repositories (namespace {}), press Ctrl-C to stop",
        hub.list().len(),
        container.config().namespace
    );

    let stopped = tokio::select! {
        result = handle.wait() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    match stopped {
        Some(result) => result,
        None => {
            info!("Shutting down");
            handle.shutdown().await
        }
    }
}
