use rudder::core::RudderResult;
use rudder::di::ServiceContainer;

pub async fn run(container: ServiceContainer, repo: String, word: Option<String>) -> RudderResult<()> {
    let repo = container.hub().get(&repo).await?;
    let briefs = repo.search(word.as_deref().unwrap_or("*"), None).await?;
    if briefs.is_empty() {
        println!("No plugins found.");
        return Ok(());
    }
    for brief in briefs {
        let mark = if brief.installed { " (installed)" } else { "" };
        println!("{:<30} {:<10} {}{}", brief.name, brief.version, brief.description, mark);
    }
    Ok(())
}
