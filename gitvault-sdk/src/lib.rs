//! # gitvault-sdk
//!
//! Blocking client for the gitvault server.
//!
//! ## Example
//!
//! ```no_run
//! use gitvault_sdk::GitvaultClient;
//!
//! let client = GitvaultClient::new("http://localhost:3030");
//!
//! // Save a document; every save becomes one commit
//! let saved = client
//!     .write_file("project:doc1", "content.md", "# Draft", "Create doc1")
//!     .unwrap();
//! println!("version {} at {}", saved.version, saved.hash);
//!
//! // Read it back as of that commit
//! let content = client.content("project:doc1", "content.md", Some(&saved.hash)).unwrap();
//! ```

use anyhow::{bail, Context, Result};
use reqwest::blocking::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct GitvaultClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
struct WriteFileRequest<'a> {
    content: &'a str,
    message: &'a str,
    author: Option<&'a Author>,
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteFileRequest<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct AttachRemoteRequest<'a> {
    token: &'a str,
    name: &'a str,
    existing_url: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteResult {
    pub hash: String,
    /// `false` when the content was already stored at this path.
    pub created: bool,
    pub version: i64,
    pub sync_scheduled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResult {
    pub hash: String,
    pub created: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub version: usize,
    pub hash: String,
    pub author: String,
    pub email: String,
    pub date: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncStatus {
    pub ok: bool,
    pub skipped_no_remote: bool,
    pub attempts: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteInfo {
    pub url: String,
    pub web_url: String,
    pub default_branch: String,
    pub sync: SyncStatus,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl GitvaultClient {
    /// Create a new gitvault client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the gitvault server (e.g., "http://localhost:3030")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn entity_url(&self, entity: &str, route: &str) -> Result<String> {
        let (kind, id) = entity
            .split_once(':')
            .with_context(|| format!("expected <kind>:<id>, got {:?}", entity))?;
        Ok(format!("{}/entities/{}/{}/{}", self.base_url, kind, id, route))
    }

    fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match response.json::<ErrorBody>() {
            Ok(body) => bail!("{}: {}", status, body.error),
            Err(_) => bail!("request failed with {}", status),
        }
    }

    /// Save `content` at `path`; one commit per call
    pub fn write_file(
        &self,
        entity: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<WriteResult> {
        self.write_file_as(entity, path, content, message, None, None)
    }

    /// Save with explicit authorship and a display title
    pub fn write_file_as(
        &self,
        entity: &str,
        path: &str,
        content: &str,
        message: &str,
        author: Option<&Author>,
        title: Option<&str>,
    ) -> Result<WriteResult> {
        let request = WriteFileRequest {
            content,
            message,
            author,
            title,
        };
        let url = self.entity_url(entity, "files")?;

        Ok(Self::send(self.client.put(url).query(&[("path", path)]).json(&request))?.json()?)
    }

    pub fn delete_file(&self, entity: &str, path: &str, message: &str) -> Result<DeleteResult> {
        let url = self.entity_url(entity, "files")?;
        let request = DeleteFileRequest { message };

        Ok(Self::send(self.client.delete(url).query(&[("path", path)]).json(&request))?.json()?)
    }

    /// Commits touching `path`, newest first
    pub fn history(&self, entity: &str, path: &str) -> Result<Vec<HistoryEntry>> {
        let url = self.entity_url(entity, "history")?;
        Ok(Self::send(self.client.get(url).query(&[("path", path)]))?.json()?)
    }

    /// Content of `path` at `commit`, or the latest content
    pub fn content(&self, entity: &str, path: &str, commit: Option<&str>) -> Result<Vec<u8>> {
        let url = self.entity_url(entity, "content")?;
        let mut request = self.client.get(url).query(&[("path", path)]);
        if let Some(commit) = commit {
            request = request.query(&[("commit", commit)]);
        }

        Ok(Self::send(request)?.bytes()?.to_vec())
    }

    /// Unified diff of `path` between two commits
    pub fn diff(&self, entity: &str, path: &str, from: &str, to: &str) -> Result<String> {
        let url = self.entity_url(entity, "diff")?;
        let request = self
            .client
            .get(url)
            .query(&[("path", path), ("from", from), ("to", to)]);

        Ok(Self::send(request)?.text()?)
    }

    pub fn sync(&self, entity: &str) -> Result<SyncStatus> {
        let url = self.entity_url(entity, "sync")?;
        Ok(Self::send(self.client.post(url))?.json()?)
    }

    /// Link the entity to a hosted repository, creating it unless `existing_url` is given
    pub fn attach_remote(
        &self,
        entity: &str,
        token: &str,
        name: &str,
        existing_url: Option<&str>,
    ) -> Result<RemoteInfo> {
        let url = self.entity_url(entity, "remote")?;
        let request = AttachRemoteRequest {
            token,
            name,
            existing_url,
        };

        Ok(Self::send(self.client.post(url).json(&request))?.json()?)
    }

    /// Check server health
    pub fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GitvaultClient::new("http://localhost:3030/");
        assert_eq!(client.base_url, "http://localhost:3030");
    }

    #[test]
    fn test_entity_url() {
        let client = GitvaultClient::new("http://localhost:3030");
        assert_eq!(
            client.entity_url("model:invoice", "history").unwrap(),
            "http://localhost:3030/entities/model/invoice/history"
        );
        assert!(client.entity_url("invoice", "history").is_err());
    }

    #[test]
    fn test_sync_status_decodes_server_payload() {
        let status: SyncStatus = serde_json::from_value(serde_json::json!({
            "ok": false,
            "skipped_no_remote": false,
            "attempts": ["push_default", "fail"],
            "error": "unreachable: timed out",
        }))
        .unwrap();
        assert!(!status.ok);
        assert_eq!(status.attempts, vec!["push_default", "fail"]);
    }

    #[test]
    fn test_unreachable_server() {
        let client = GitvaultClient::new("http://127.0.0.1:9");
        assert!(client.health_check().is_err());
    }
}
