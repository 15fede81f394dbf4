use crate::display::short;
use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use gitvault_core::EngineConfig;

pub async fn run(
    config: EngineConfig,
    entity: String,
    path: String,
    message: String,
    yes: bool,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} from {}?", path, entity))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", "Aborted".yellow());
            return Ok(());
        }
    }

    let store = super::open_store(config)?;
    let result = store.delete(&entity, &path, &message, None).await?;

    println!(
        "{} {} {}",
        "✓ Deleted".green().bold(),
        path.white().bold(),
        short(&result.hash).yellow()
    );
    println!(
        "{}",
        "Earlier versions remain readable with `gitvault show --commit`".dimmed()
    );

    Ok(())
}
