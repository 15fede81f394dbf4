use crate::display::{print_diff, short};
use anyhow::Result;
use colored::Colorize;
use gitvault_core::EngineConfig;

pub async fn run(
    config: EngineConfig,
    entity: String,
    path: String,
    from: String,
    to: String,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let store = super::open_store(config)?;

    let diff = store.file_diff(&entity, &path, &from, &to).await?;

    println!("{}", "━".repeat(80).bright_black());
    let status = match (&diff.old_content, &diff.new_content) {
        (None, _) => "NEW".green(),
        (_, None) => "DEL".red(),
        _ => "MOD".yellow(),
    };
    println!(
        "{} {} {}",
        status,
        path.white().bold(),
        format!("{}..{}", short(&from), short(&to)).dimmed()
    );
    println!();

    if !diff.has_changes() {
        println!("{}", "No differences".green());
        return Ok(());
    }

    print_diff(&diff);
    println!();

    Ok(())
}
