use crate::api::{create_router, AppState};
use crate::ledger::Ledger;
use anyhow::Context;
use axum::Router;
use gitvault_core::{EngineConfig, VersionStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct GitvaultServer {
    state: AppState,
    db_path: PathBuf,
}

impl GitvaultServer {
    pub fn new(config: EngineConfig, db_path: PathBuf, auto_sync: bool) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let store = VersionStore::new(config).context("building version store")?;
        let ledger = Ledger::new(&db_path)
            .with_context(|| format!("opening ledger at {}", db_path.display()))?;

        Ok(Self {
            state: AppState::new(store, ledger, auto_sync),
            db_path,
        })
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.router();

        info!("Server listening on {}", addr);
        info!("Repositories: {:?}", self.state.store.config().root);
        info!("Ledger: {:?}", self.db_path);
        if !self.state.auto_sync {
            info!("Automatic mirroring disabled");
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
