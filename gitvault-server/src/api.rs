use crate::ledger::{hash_content, Ledger, VersionRecord};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use gitvault_core::{
    locks::RepoLocks, EntityId, EntityKind, Error as EngineError, Identity, RemoteInfo,
    SyncResult, VersionStore,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<VersionStore>,
    pub ledger: Arc<Mutex<Ledger>>,
    /// Held across the dedup check, the commit and the ledger insert.
    pub saves: Arc<RepoLocks>,
    pub auto_sync: bool,
}

impl AppState {
    pub fn new(store: VersionStore, ledger: Ledger, auto_sync: bool) -> Self {
        Self {
            store: Arc::new(store),
            ledger: Arc::new(Mutex::new(ledger)),
            saves: Arc::new(RepoLocks::new()),
            auto_sync,
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    #[error("Identical content is already stored at {existing} in {entity}")]
    DuplicateContent { entity: String, existing: String },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(e) => match e {
                EngineError::InvalidPath(_) | EngineError::InvalidEntity(_) => {
                    StatusCode::BAD_REQUEST
                }
                EngineError::ContentNotFound { .. } | EngineError::CommitNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                EngineError::ProviderApi(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::DuplicateContent { .. } => StatusCode::CONFLICT,
            ApiError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn create_router(state: AppState) -> Router {
    let entity_routes = Router::new()
        .route("/files", put(write_file).delete(delete_file))
        .route("/history", get(get_history))
        .route("/versions", get(get_versions))
        .route("/content", get(get_content))
        .route("/diff", get(get_diff))
        .route("/sync", post(sync_entity))
        .route("/remote", post(attach_remote));

    Router::new()
        .route("/health", get(health_check))
        .nest("/entities/:kind/:id", entity_routes)
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

fn entity(kind: &str, id: &str) -> ApiResult<EntityId> {
    let kind = EntityKind::parse(kind)
        .ok_or_else(|| EngineError::InvalidEntity(format!("{}:{}", kind, id)))?;
    Ok(EntityId::new(kind, id)?)
}

#[derive(Deserialize)]
struct PathQuery {
    path: String,
}

#[derive(Deserialize)]
struct OptionalPathQuery {
    path: Option<String>,
}

#[derive(Deserialize)]
struct WriteFileRequest {
    content: String,
    message: String,
    author: Option<Identity>,
    title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteFileResponse {
    pub hash: String,
    pub created: bool,
    pub version: i64,
    pub sync_scheduled: bool,
}

async fn write_file(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<PathQuery>,
    Json(req): Json<WriteFileRequest>,
) -> ApiResult<Json<WriteFileResponse>> {
    let entity = entity(&kind, &id)?;
    let path = gitvault_core::repository::normalize_tracked_path(&query.path)?;
    let content_hash = hash_content(req.content.as_bytes());

    let _save = state.saves.write(&entity).await;

    let duplicate = state.ledger().find_duplicate(&entity, &path, &content_hash)?;
    if let Some(existing) = duplicate {
        return Err(ApiError::DuplicateContent {
            entity: entity.to_string(),
            existing,
        });
    }

    let result = state
        .store
        .commit(
            &entity,
            &path,
            req.content.as_bytes(),
            &req.message,
            req.author.as_ref(),
        )
        .await?;

    let version = {
        let ledger = state.ledger();
        match ledger.latest(&entity, &path)? {
            Some(latest) if !result.created && latest.commit_hash == result.hash => latest.version,
            _ => {
                let version = ledger.next_version(&entity, &path)?;
                ledger.record(
                    &VersionRecord::new(&entity, &path, version, &result.hash)
                        .with_content_hash(content_hash)
                        .with_title(req.title),
                )?;
                version
            }
        }
    };

    let sync_scheduled = state.auto_sync && result.created;
    if sync_scheduled {
        spawn_sync(Arc::clone(&state.store), entity);
    }

    Ok(Json(WriteFileResponse {
        hash: result.hash,
        created: result.created,
        version,
        sync_scheduled,
    }))
}

/// Mirror in the background; the save has already succeeded either way.
fn spawn_sync(store: Arc<VersionStore>, entity: EntityId) {
    tokio::spawn(async move {
        match store.sync(&entity).await {
            Ok(result) if result.ok => {}
            Ok(result) => warn!(
                "{} saved locally, not yet mirrored: {}",
                entity,
                result.error.unwrap_or_default()
            ),
            Err(e) => warn!("{} saved locally, not yet mirrored: {}", entity, e),
        }
    });
}

#[derive(Deserialize)]
struct DeleteFileRequest {
    message: String,
    author: Option<Identity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub hash: String,
    pub created: bool,
}

async fn delete_file(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<PathQuery>,
    Json(req): Json<DeleteFileRequest>,
) -> ApiResult<Json<DeleteFileResponse>> {
    let entity = entity(&kind, &id)?;
    let path = gitvault_core::repository::normalize_tracked_path(&query.path)?;

    let _save = state.saves.write(&entity).await;
    let result = state
        .store
        .delete(&entity, &path, &req.message, req.author.as_ref())
        .await?;

    {
        let ledger = state.ledger();
        let version = ledger.next_version(&entity, &path)?;
        ledger.record(&VersionRecord::new(&entity, &path, version, &result.hash))?;
    }

    if state.auto_sync {
        spawn_sync(Arc::clone(&state.store), entity);
    }

    Ok(Json(DeleteFileResponse {
        hash: result.hash,
        created: result.created,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: usize,
    pub hash: String,
    pub author: String,
    pub email: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

async fn get_history(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<OptionalPathQuery>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let entity = entity(&kind, &id)?;
    let commits = match query.path.as_deref() {
        Some(path) => state.store.log(&entity, path).await?,
        None => state.store.log_all(&entity).await?,
    };

    // Newest first, so the oldest commit is version 1.
    let total = commits.len();
    let entries = commits
        .into_iter()
        .enumerate()
        .map(|(i, commit)| HistoryEntry {
            version: total - i,
            hash: commit.hash,
            author: commit.author,
            email: commit.email,
            date: commit.date,
            message: commit.message,
        })
        .collect();

    Ok(Json(entries))
}

async fn get_versions(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<Vec<VersionRecord>>> {
    let entity = entity(&kind, &id)?;
    let path = gitvault_core::repository::normalize_tracked_path(&query.path)?;
    let versions = state.ledger().versions(&entity, &path)?;
    Ok(Json(versions))
}

#[derive(Deserialize)]
struct ContentQuery {
    path: String,
    commit: Option<String>,
}

async fn get_content(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<ContentQuery>,
) -> ApiResult<Vec<u8>> {
    let entity = entity(&kind, &id)?;
    let content = state
        .store
        .read_at(&entity, &query.path, query.commit.as_deref())
        .await?;
    Ok(content)
}

#[derive(Deserialize)]
struct DiffQuery {
    path: String,
    from: String,
    to: String,
}

async fn get_diff(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<DiffQuery>,
) -> ApiResult<String> {
    let entity = entity(&kind, &id)?;
    let diff = state
        .store
        .diff(&entity, &query.path, &query.from, &query.to)
        .await?;
    Ok(diff)
}

async fn sync_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<Json<SyncResult>> {
    let entity = entity(&kind, &id)?;
    let result = state.store.sync(&entity).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct AttachRemoteRequest {
    token: String,
    name: String,
    existing_url: Option<String>,
}

async fn attach_remote(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<AttachRemoteRequest>,
) -> ApiResult<Json<RemoteInfo>> {
    let entity = entity(&kind, &id)?;
    let info = state
        .store
        .attach(&entity, &req.token, &req.name, req.existing_url.as_deref())
        .await?;
    info!("{} attached to {}", entity, info.web_url);
    Ok(Json(info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use gitvault_core::EngineConfig;
    use serde_json::Value;
    use std::process::Command;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn setup(dir: &TempDir) -> Router {
        let config = EngineConfig::default().with_root(dir.path().join("repos"));
        let store = VersionStore::new(config).unwrap();
        create_router(AppState::new(store, Ledger::in_memory().unwrap(), false))
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let app = setup(&dir);

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn test_write_history_and_content() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let app = setup(&dir);
        let uri = "/entities/project/doc1/files?path=content.md";

        let (status, first) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"content": "v1\n", "message": "Create doc1", "title": "Doc"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let first = json(&first);
        assert_eq!(first["version"], 1);
        assert_eq!(first["created"], true);

        let (_, second) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({
                "content": "v2\n",
                "message": "Update doc1",
                "author": {"name": "Ada", "email": "ada@example.com"}
            })),
        )
        .await;
        let second = json(&second);
        assert_eq!(second["version"], 2);

        let (_, again) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"content": "v2\n", "message": "Update doc1"})),
        )
        .await;
        let again = json(&again);
        assert_eq!(again["created"], false);
        assert_eq!(again["version"], 2);
        assert_eq!(again["hash"], second["hash"]);

        let (status, history) =
            send(&app, "GET", "/entities/project/doc1/history?path=content.md", None).await;
        assert_eq!(status, StatusCode::OK);
        let history = json(&history);
        assert_eq!(history[0]["version"], 2);
        assert_eq!(history[0]["author"], "Ada");
        assert_eq!(history[1]["version"], 1);
        assert_eq!(history[1]["hash"], first["hash"]);

        let old = format!(
            "/entities/project/doc1/content?path=content.md&commit={}",
            first["hash"].as_str().unwrap()
        );
        let (status, content) = send(&app, "GET", &old, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content, b"v1\n");

        let (_, versions) =
            send(&app, "GET", "/entities/project/doc1/versions?path=content.md", None).await;
        let versions = json(&versions);
        assert_eq!(versions.as_array().unwrap().len(), 2);
        assert_eq!(versions[1]["title"], "Doc");
    }

    #[tokio::test]
    async fn test_duplicate_content_is_refused() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let app = setup(&dir);
        let body = serde_json::json!({"content": "same", "message": "Save"});

        let (status, _) = send(
            &app,
            "PUT",
            "/entities/model/invoice/files?path=a.json",
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, error) = send(
            &app,
            "PUT",
            "/entities/model/invoice/files?path=b.json",
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json(&error)["error"].as_str().unwrap().contains("a.json"));

        let (status, _) = send(
            &app,
            "PUT",
            "/entities/model/other/files?path=b.json",
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let app = setup(&dir);
        let body = serde_json::json!({"content": "x", "message": "Save"});

        let (status, _) = send(
            &app,
            "PUT",
            "/entities/project/doc1/files?path=../escape.md",
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "PUT",
            "/entities/folder/doc1/files?path=a.md",
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "GET",
            "/entities/project/doc1/content?path=missing.md",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "DELETE",
            "/entities/project/doc1/files?path=missing.md",
            Some(serde_json::json!({"message": "Delete"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_diff_and_sync() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let app = setup(&dir);
        let uri = "/entities/universal/site/files?path=page.md";

        let (_, a) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"content": "one\n", "message": "Create"})),
        )
        .await;
        let (_, b) = send(
            &app,
            "PUT",
            uri,
            Some(serde_json::json!({"content": "two\n", "message": "Edit"})),
        )
        .await;

        let diff_uri = format!(
            "/entities/universal/site/diff?path=page.md&from={}&to={}",
            json(&a)["hash"].as_str().unwrap(),
            json(&b)["hash"].as_str().unwrap()
        );
        let (status, diff) = send(&app, "GET", &diff_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let diff = String::from_utf8(diff).unwrap();
        assert!(diff.contains("-one\n+two\n"));

        let (status, deleted) = send(
            &app,
            "DELETE",
            uri,
            Some(serde_json::json!({"message": "Delete page.md"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&deleted)["created"], true);

        let (status, _) = send(
            &app,
            "GET",
            "/entities/universal/site/content?path=page.md",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, sync) = send(&app, "POST", "/entities/universal/site/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&sync)["skipped_no_remote"], true);
    }
}
