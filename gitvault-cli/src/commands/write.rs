use crate::display::short;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use gitvault_core::{EngineConfig, Identity};
use std::path::PathBuf;

pub async fn run(
    config: EngineConfig,
    entity: String,
    path: String,
    file: Option<PathBuf>,
    content: Option<String>,
    message: String,
    author: Option<(String, String)>,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let bytes = match (file, content) {
        (Some(file), _) => {
            std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?
        }
        (None, Some(content)) => content.into_bytes(),
        (None, None) => bail!("Provide the content with --file or --content"),
    };
    let author = author.map(|(name, email)| Identity::new(name, email));

    let store = super::open_store(config)?;
    let result = store
        .commit(&entity, &path, &bytes, &message, author.as_ref())
        .await?;

    if result.created {
        println!(
            "{} {} {}",
            "✓ Committed".green().bold(),
            path.white().bold(),
            short(&result.hash).yellow()
        );
    } else {
        println!(
            "{} {} {}",
            "No changes to".yellow(),
            path.white().bold(),
            format!("(still at {})", short(&result.hash)).dimmed()
        );
    }

    Ok(())
}
