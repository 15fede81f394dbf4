use crate::display::print_sync_result;
use anyhow::Result;
use gitvault_core::EngineConfig;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub async fn run(config: EngineConfig, entity: String) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let store = super::open_store(config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message(format!("Mirroring {}...", entity));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = store.sync(&entity).await;
    spinner.finish_and_clear();

    print_sync_result(&result?);

    Ok(())
}
