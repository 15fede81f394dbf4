use crate::display::{print_commit, print_diff, short};
use anyhow::{Context, Result};
use colored::Colorize;
use gitvault_core::EngineConfig;

pub async fn run(
    config: EngineConfig,
    entity: String,
    path: String,
    commit: String,
    execute: bool,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let store = super::open_store(config)?;

    let target = store
        .log(&entity, &path)
        .await?
        .into_iter()
        .find(|c| c.hash.starts_with(&commit))
        .with_context(|| format!("{} is not in the history of {}", commit, path))?;
    let content = store.read_at(&entity, &path, Some(&target.hash)).await?;

    println!("{}", "Restore Preview".bold().cyan());
    println!("  {}: {}", "Path".bold(), path);
    println!();
    print_commit(&target, None);

    let diff = store.file_diff(&entity, &path, "HEAD", &target.hash).await?;
    if !diff.has_changes() {
        println!("{}", "Already at this version, nothing to restore".yellow());
        return Ok(());
    }
    print_diff(&diff);
    println!();

    if !execute {
        println!("{}", "This is a preview only.".yellow());
        println!(
            "Run with {} to actually perform the restore",
            "--execute".cyan()
        );
        return Ok(());
    }

    let message = format!("Restore {} to {}", path, short(&target.hash));
    let result = store
        .commit(&entity, &path, &content, &message, None)
        .await?;

    println!(
        "{}",
        format!("✓ Restored {} as {}", path, short(&result.hash))
            .green()
            .bold()
    );

    Ok(())
}
