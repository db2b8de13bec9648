use rudder::core::{Info, RudderResult};
use rudder::di::{InfoStore, ServiceContainer};

pub async fn add(container: ServiceContainer, name: String, url: String) -> RudderResult<()> {
    let repo = container.hub().add(&Info::new(name, url)).await?;
    println!("✓ Added {} ({} packages)", repo.name(), repo.len());
    Ok(())
}

pub async fn remove(container: ServiceContainer, name: String) -> RudderResult<()> {
    let hub = container.hub();
    hub.get(&name).await?;
    let repo = hub.delete(&name).await?;
    repo.close()?;
    println!("✓ Removed {}", name);
    Ok(())
}

pub async fn list(container: ServiceContainer) -> RudderResult<()> {
    let mut infos = container.store.list().await?;
    if infos.is_empty() {
        println!("No repositories.");
        return Ok(());
    }
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    for info in infos {
        println!("{:<20} {}", info.name, info.url);
    }
    Ok(())
}

pub async fn update(container: ServiceContainer, name: String) -> RudderResult<()> {
    let repo = container.hub().get(&name).await?;
    if repo.update().await? {
        println!("✓ Updated {} ({} packages)", name, repo.len());
    } else {
        println!("{} is up to date", name);
    }
    Ok(())
}
