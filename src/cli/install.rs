use rudder::core::{InstallOption, RudderResult};
use rudder::di::ServiceContainer;

pub async fn run(
    container: ServiceContainer,
    repo: String,
    name: String,
    version: Option<String>,
    id: Option<String>,
    set: Vec<String>,
) -> RudderResult<()> {
    let options = set
        .iter()
        .map(|s| InstallOption::parse(s))
        .collect::<RudderResult<Vec<_>>>()?;

    let repo = container.hub().get(&repo).await?;
    let mut installer = repo.get(&name, version.as_deref()).await?;
    if let Some(id) = id {
        installer.set_id(id);
    }
    let release = installer.install(&options).await?;
    println!(
        "✓ Installed {} {} as {} in {}",
        release.chart_name, release.chart_version, release.name, release.namespace
    );
    Ok(())
}
