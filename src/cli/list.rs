use rudder::core::RudderResult;
use rudder::di::{DeploymentTarget, ServiceContainer};

pub async fn run(container: ServiceContainer) -> RudderResult<()> {
    let releases = container.target.list().await?;
    if releases.is_empty() {
        println!("No plugins installed.");
        return Ok(());
    }
    for release in releases {
        println!(
            "{:<20} {:<12} {}/{}@{}  {}",
            release.name,
            release.namespace,
            release.repo,
            release.chart_name,
            release.chart_version,
            release.installed_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
