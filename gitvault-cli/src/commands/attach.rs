use crate::display::print_sync_result;
use anyhow::Result;
use colored::Colorize;
use gitvault_core::EngineConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub async fn run(
    config: EngineConfig,
    entity: String,
    token: String,
    name: String,
    url: Option<String>,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let store = super::open_store(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message(match &url {
        Some(url) => format!("Linking {} to {}...", entity, url),
        None => format!("Creating remote repository {}...", name),
    });
    spinner.enable_steady_tick(Duration::from_millis(100));

    let info = store.attach(&entity, &token, &name, url.as_deref()).await;
    spinner.finish_and_clear();
    let info = info?;

    println!("{}", "Remote attached".bold().cyan());
    println!("   {}: {}", "Repository".bold(), info.web_url.green());
    println!("   {}: {}", "Remote".bold(), info.url);
    println!("   {}: {}", "Branch".bold(), info.default_branch);
    println!();
    print_sync_result(&info.sync);

    Ok(())
}
