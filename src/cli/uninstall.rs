use rudder::core::{InstallerBrief, RudderResult};
use rudder::di::ServiceContainer;
use tracing::debug;

pub async fn run(
    container: ServiceContainer,
    id: String,
    repo: Option<String>,
    name: Option<String>,
    version: Option<String>,
) -> RudderResult<()> {
    let hub = container.hub();
    let brief = InstallerBrief {
        name: name.unwrap_or_default(),
        repo: repo.unwrap_or_default(),
        version: version.unwrap_or_default(),
        installed: true,
        description: String::new(),
        annotations: Default::default(),
    };
    if !brief.repo.is_empty() {
        if let Err(e) = hub.get(&brief.repo).await {
            debug!("Repository {} unavailable: {}", brief.repo, e);
        }
    }

    let release = hub.uninstall(&id, &brief).await?;
    println!("✓ Uninstalled {} ({} {})", release.name, release.chart_name, release.chart_version);
    Ok(())
}
