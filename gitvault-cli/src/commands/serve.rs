use anyhow::Result;
use colored::Colorize;
use gitvault_core::EngineConfig;
use gitvault_server::GitvaultServer;
use std::path::PathBuf;

pub async fn run(
    config: EngineConfig,
    port: u16,
    db: Option<PathBuf>,
    auto_sync: bool,
) -> Result<()> {
    let db_path = db.unwrap_or_else(|| super::default_db_path(&config.root));

    println!("{}", "🚀 Starting gitvault server...".bold().cyan());
    println!("   {}: {:?}", "Repositories".bold(), config.root);
    println!("   {}: {:?}", "Ledger".bold(), db_path);
    println!(
        "   {}: {}",
        "Auto sync".bold(),
        if auto_sync { "on".green() } else { "off".yellow() }
    );

    let server = GitvaultServer::new(config, db_path, auto_sync)?;

    println!(
        "   {}: {}",
        "API Server".bold(),
        format!("http://localhost:{}", port).green()
    );
    println!();
    println!("{}", "Press Ctrl+C to stop".dimmed());
    println!();

    let addr = format!("0.0.0.0:{}", port).parse()?;
    server.serve(addr).await?;

    Ok(())
}
