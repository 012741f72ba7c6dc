//! TOML-based configuration for the docs gatekeeper.
//!
//! Credentials are never stored in the file: `*_env` fields name the
//! environment variables holding them, and the values are resolved at
//! runtime via [`GatekeeperConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::executor::ExecutorOptions;
use crate::repository::DOCUMENTATION_TAG;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// Log level filter (default `info`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Document server settings.
    pub discourse: DiscourseConfig,

    /// Local documentation layout.
    #[serde(default)]
    pub docs: DocsConfig,

    /// Synchronization behaviour.
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_log_level() -> String {
    "info".into()
}

// ---------------------------------------------------------------------------
// Discourse
// ---------------------------------------------------------------------------

/// Document server (Discourse) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscourseConfig {
    /// Hostname of the server, without scheme or path.
    pub host: String,

    /// Category new topics are created in.
    #[serde(default)]
    pub category_id: Option<u64>,

    /// Environment variable holding the API username.
    #[serde(default = "default_api_username_env")]
    pub api_username_env: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Resolved API username (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub api_username: Option<String>,

    /// Resolved API key (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_api_username_env() -> String {
    "DISCOURSE_API_USERNAME".into()
}
fn default_api_key_env() -> String {
    "DISCOURSE_API_KEY".into()
}

// ---------------------------------------------------------------------------
// Docs
// ---------------------------------------------------------------------------

/// Where the documentation lives locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Documentation directory, relative to the repository root.
    #[serde(default = "default_docs_dir")]
    pub dir: PathBuf,

    /// Index file name inside the documentation directory.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Project name used in topic titles.
    #[serde(default)]
    pub name: String,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_index_file() -> String {
    "index.md".into()
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            dir: default_docs_dir(),
            index_file: default_index_file(),
            name: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Synchronization behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Report actions without applying them.
    #[serde(default)]
    pub dry_run: bool,

    /// Delete topics of pages removed locally.
    #[serde(default = "default_true")]
    pub delete_topics: bool,

    /// Tag marking the last synchronized commit.
    #[serde(default = "default_base_tag")]
    pub base_tag: String,
}

fn default_true() -> bool {
    true
}
fn default_base_tag() -> String {
    DOCUMENTATION_TAG.into()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            delete_topics: true,
            base_tag: default_base_tag(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl GatekeeperConfig {
    /// Load a [`GatekeeperConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: GatekeeperConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the credential `*_env` fields from environment variables.
    ///
    /// Missing variables log a warning but do not fail; offline commands
    /// need no credentials.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        self.discourse.api_username = resolve_optional_env(
            &self.discourse.api_username_env,
            "discourse.api_username_env",
        );
        self.discourse.api_key =
            resolve_optional_env(&self.discourse.api_key_env, "discourse.api_key_env");

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.discourse.host.trim();
        if host.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "discourse.host".into(),
                detail: "host must not be empty".into(),
            });
        }
        if host.contains("://") || host.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "discourse.host".into(),
                detail: "host must be a bare hostname without scheme or path".into(),
            });
        }
        if self.sync.base_tag.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sync.base_tag".into(),
                detail: "base tag must not be empty".into(),
            });
        }
        if self.docs.index_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "docs.index_file".into(),
                detail: "index file name must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Options for the action executor.
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            dry_run: self.sync.dry_run,
            delete_topics: self.sync.delete_topics,
            name: self.docs.name.clone(),
        }
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
