use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::{attach, delete, diff, log, restore, serve, show, sync, write};

#[derive(Parser)]
#[command(name = "gitvault")]
#[command(version, about = "Git-backed versioned content store", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "GITVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory holding one repository per entity
    #[arg(short, long, global = true, env = "GITVAULT_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a file and commit it
    Write {
        /// Entity as <kind>:<id>, e.g. project:doc1
        entity: String,

        /// Path inside the entity's repository
        path: String,

        /// Read content from this file
        #[arg(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Literal content
        #[arg(long)]
        content: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: String,

        #[arg(long, requires = "author_email")]
        author_name: Option<String>,

        #[arg(long, requires = "author_name")]
        author_email: Option<String>,
    },

    /// Delete a file and commit the removal
    Delete {
        entity: String,
        path: String,

        #[arg(short, long)]
        message: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show commit history, for one path or the whole repository
    Log {
        entity: String,
        path: Option<String>,

        /// Number of commits to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print a file as of a commit
    Show {
        entity: String,
        path: String,

        /// Commit to read from (defaults to HEAD)
        #[arg(short, long)]
        commit: Option<String>,
    },

    /// Diff a file between two commits
    Diff {
        entity: String,
        path: String,
        from: String,
        to: String,
    },

    /// Restore a file to its content at an earlier commit
    Restore {
        entity: String,
        path: String,
        commit: String,

        /// Actually write the restore commit (without this, just shows preview)
        #[arg(long)]
        execute: bool,
    },

    /// Mirror an entity's repository to its remote
    Sync { entity: String },

    /// Link an entity to a hosted remote repository
    Attach {
        entity: String,

        /// Access token for the hosting provider
        #[arg(long, env = "GITVAULT_TOKEN", hide_env_values = true)]
        token: String,

        /// Name for a newly created remote repository
        #[arg(long)]
        name: String,

        /// Use this existing repository instead of creating one
        #[arg(long)]
        url: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Port for the API server
        #[arg(short, long, default_value = "3030")]
        port: u16,

        /// Ledger database path
        #[arg(short, long)]
        db: Option<PathBuf>,

        /// Do not mirror to remotes after each save
        #[arg(long)]
        no_auto_sync: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config, cli.root)?;

    match cli.command {
        Commands::Write {
            entity,
            path,
            file,
            content,
            message,
            author_name,
            author_email,
        } => {
            let author = author_name.zip(author_email);
            write::run(config, entity, path, file, content, message, author).await?;
        }
        Commands::Delete {
            entity,
            path,
            message,
            yes,
        } => {
            delete::run(config, entity, path, message, yes).await?;
        }
        Commands::Log {
            entity,
            path,
            limit,
        } => {
            log::run(config, entity, path, limit).await?;
        }
        Commands::Show {
            entity,
            path,
            commit,
        } => {
            show::run(config, entity, path, commit).await?;
        }
        Commands::Diff {
            entity,
            path,
            from,
            to,
        } => {
            diff::run(config, entity, path, from, to).await?;
        }
        Commands::Restore {
            entity,
            path,
            commit,
            execute,
        } => {
            restore::run(config, entity, path, commit, execute).await?;
        }
        Commands::Sync { entity } => {
            sync::run(config, entity).await?;
        }
        Commands::Attach {
            entity,
            token,
            name,
            url,
        } => {
            attach::run(config, entity, token, name, url).await?;
        }
        Commands::Serve {
            port,
            db,
            no_auto_sync,
        } => {
            serve::run(config, port, db, !no_auto_sync).await?;
        }
    }

    Ok(())
}
