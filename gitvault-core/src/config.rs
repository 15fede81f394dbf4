use crate::error::{Error, Result};
use crate::models::Identity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed root under which every entity gets its own repository.
    pub root: PathBuf,
    pub git_binary: String,
    pub command_timeout_secs: u64,
    /// Timeout for push and pull, which cross the network.
    pub network_timeout_secs: u64,
    pub identity: Identity,
    pub default_branch: String,
    pub secondary_branch: String,
    pub remote_name: String,
    pub handle_cache_capacity: usize,
    pub ignore_patterns: Vec<String>,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_base: String,
    pub private: bool,
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".gitvault").join("repos"),
            git_binary: "git".to_string(),
            command_timeout_secs: 30,
            network_timeout_secs: 120,
            identity: Identity::default(),
            default_branch: "main".to_string(),
            secondary_branch: "master".to_string(),
            remote_name: "origin".to_string(),
            handle_cache_capacity: 1024,
            ignore_patterns: vec![
                "*.tmp".to_string(),
                "*.log".to_string(),
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "*.swp".to_string(),
                "*~".to_string(),
            ],
            provider: ProviderConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            private: true,
            timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_provider_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.provider.api_base = api_base.into();
        self
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn ignore_file_contents(&self) -> String {
        let mut contents = self.ignore_patterns.join("\n");
        contents.push('\n');
        contents
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Config("root cannot be empty".to_string()));
        }

        if self.git_binary.is_empty() {
            return Err(Error::Config("git_binary cannot be empty".to_string()));
        }

        if self.command_timeout_secs == 0 || self.network_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be greater than 0".to_string()));
        }

        if self.default_branch.is_empty() || self.secondary_branch.is_empty() {
            return Err(Error::Config("branch names cannot be empty".to_string()));
        }

        if self.default_branch == self.secondary_branch {
            return Err(Error::Config(
                "default_branch and secondary_branch must differ".to_string(),
            ));
        }

        if self.remote_name.is_empty() {
            return Err(Error::Config("remote_name cannot be empty".to_string()));
        }

        if self.identity.name.is_empty() || self.identity.email.is_empty() {
            return Err(Error::Config("identity needs a name and an email".to_string()));
        }

        if self.handle_cache_capacity == 0 {
            return Err(Error::Config(
                "handle_cache_capacity must be greater than 0".to_string(),
            ));
        }

        if !self.provider.api_base.starts_with("http://")
            && !self.provider.api_base.starts_with("https://")
        {
            return Err(Error::Config(
                "provider.api_base must start with http:// or https://".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.secondary_branch, "master");
        assert!(config.ignore_file_contents().contains("*.tmp\n"));
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gitvault.toml");
        std::fs::write(
            &path,
            r#"
root = "/var/lib/gitvault"
network_timeout_secs = 5

[identity]
name = "Platform"
email = "platform@example.com"
"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.root, PathBuf::from("/var/lib/gitvault"));
        assert_eq!(config.network_timeout(), Duration::from_secs(5));
        assert_eq!(config.identity.name, "Platform");
        assert_eq!(config.remote_name, "origin");
    }

    #[test]
    fn test_validate_rejects_same_branches() {
        let mut config = EngineConfig::default();
        config.secondary_branch = "main".to_string();
        assert!(config.validate().is_err());
    }
}
