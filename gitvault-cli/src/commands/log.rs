use crate::display::print_commit;
use anyhow::Result;
use colored::Colorize;
use gitvault_core::EngineConfig;

pub async fn run(
    config: EngineConfig,
    entity: String,
    path: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let store = super::open_store(config)?;

    let commits = match &path {
        Some(path) => store.log(&entity, path).await?,
        None => store.log_all(&entity).await?,
    };

    if commits.is_empty() {
        println!("{}", "No history for this path".yellow());
        return Ok(());
    }

    match &path {
        Some(path) => println!("{} {}", "History of".bold().cyan(), path.bold()),
        None => println!("{} {}", "History of".bold().cyan(), entity.to_string().bold()),
    }
    println!();

    let to_show = limit.unwrap_or(commits.len()).min(commits.len());
    let total = commits.len();

    for (i, commit) in commits.iter().take(to_show).enumerate() {
        print_commit(commit, path.as_ref().map(|_| total - i));
    }

    if total > to_show {
        println!(
            "{}",
            format!("... and {} more commits", total - to_show).dimmed()
        );
        println!("Use {} to see more", "--limit N".cyan());
    }

    Ok(())
}
