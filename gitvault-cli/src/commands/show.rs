use anyhow::Result;
use gitvault_core::EngineConfig;
use std::io::Write;

pub async fn run(
    config: EngineConfig,
    entity: String,
    path: String,
    commit: Option<String>,
) -> Result<()> {
    let entity = super::parse_entity(&entity)?;
    let store = super::open_store(config)?;

    let content = store.read_at(&entity, &path, commit.as_deref()).await?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;

    Ok(())
}
