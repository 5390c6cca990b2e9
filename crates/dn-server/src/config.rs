//! Server configuration
//!
//! Loaded from an optional TOML file; every section has defaults, so an empty
//! file (or none at all) yields a runnable server. CLI flags override the
//! `[server]` and `[logging]` values after loading.

use dn_artifact::DocId;
use dn_core::{HeuristicConfig, Limits, OpsConfig};
use dn_store::cid_engine::DEFAULT_CAPACITY;
use dn_store::{Grant, StaticAccessPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8787";
/// Default route prefix
pub const DEFAULT_BASE_PATH: &str = "dni-abilities/v1";
/// Default provider timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are individually valid but unusable together
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Full server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listener and routing
    pub server: HttpConfig,
    /// Generation provider selection
    pub generation: GenerationConfig,
    /// Heuristic fallback parameters
    pub heuristic: HeuristicConfig,
    /// Prompt limits
    pub limits: Limits,
    /// CID cache sizing
    pub cache: CacheConfig,
    /// Bearer sessions and grants
    pub access: AccessConfig,
    /// Documents loaded at startup
    pub seed: SeedConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Socket address to bind
    pub listen: String,
    /// Route prefix, slash separated
    pub base_path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }
}

/// Which generation provider to run with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// No provider; every generation falls back to the heuristic
    #[default]
    Absent,
    /// Chat-completions style HTTP endpoint
    Http,
}

/// `[generation]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Provider kind
    pub kind: ProviderKind,
    /// Endpoint URL (`http` only)
    pub endpoint: Option<String>,
    /// Model used when the caller states no preference
    pub model: Option<String>,
    /// Name reported in results; defaults to the model or `http`
    pub name: Option<String>,
    /// Environment variable holding the bearer key
    pub api_key_env: Option<String>,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Absent,
            endpoint: None,
            model: None,
            name: None,
            api_key_env: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached CIDs
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// One bearer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Actor id the token authenticates as
    pub actor: String,
    /// Edit every document
    #[serde(default)]
    pub edit_all: bool,
    /// Editable documents when `edit_all` is false
    #[serde(default)]
    pub docs: Vec<DocId>,
}

/// `[access]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Bearer token -> session
    pub sessions: BTreeMap<String, Session>,
}

impl AccessConfig {
    /// Actor for a bearer token
    #[must_use]
    pub fn actor_for(&self, token: &str) -> Option<&str> {
        self.sessions.get(token).map(|s| s.actor.as_str())
    }

    /// Grant table keyed by actor id
    ///
    /// Several tokens may name the same actor; their grants are merged.
    #[must_use]
    pub fn policy(&self) -> StaticAccessPolicy {
        let mut grants: BTreeMap<&str, Grant> = BTreeMap::new();
        for session in self.sessions.values() {
            let grant = grants.entry(session.actor.as_str()).or_default();
            grant.edit_all |= session.edit_all;
            grant.docs.extend(session.docs.iter().copied());
        }
        grants
            .into_iter()
            .fold(StaticAccessPolicy::new(), |policy, (actor, grant)| {
                policy.with_grant(actor, grant)
            })
    }
}

/// `[seed]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// JSON array of documents
    pub path: Option<PathBuf>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file
    ///
    /// # Errors
    /// - `Read` if the file cannot be read
    /// - `Parse` / `Invalid` as for [`ServerConfig::from_toml`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// - `Parse` on malformed TOML or unknown sections
    /// - `Invalid` if [`ServerConfig::validate`] fails
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// - `Invalid` describing the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.base_segments().is_empty() {
            return Err(ConfigError::Invalid("server.base_path is empty".to_string()));
        }
        if self.generation.kind == ProviderKind::Http
            && self.generation.endpoint.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "generation.endpoint is required for kind = \"http\"".to_string(),
            ));
        }
        if self.cache.max_capacity == 0 {
            return Err(ConfigError::Invalid("cache.max_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Parsed listen address
    ///
    /// # Errors
    /// - `Invalid` if `server.listen` is not a socket address
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.listen {:?}: {e}", self.server.listen)))
    }

    /// Route prefix split into path segments
    #[must_use]
    pub fn base_segments(&self) -> Vec<String> {
        self.server
            .base_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Operation set configuration
    #[must_use]
    pub fn ops_config(&self) -> OpsConfig {
        OpsConfig::new()
            .with_heuristic(self.heuristic.clone())
            .with_limits(self.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr().unwrap().port(), 8787);
        assert_eq!(config.base_segments(), vec!["dni-abilities", "v1"]);
        assert_eq!(config.ops_config(), OpsConfig::default());
    }

    #[test]
    fn sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            listen = "127.0.0.1:9000"
            base_path = "/api/"

            [heuristic]
            summary_words = 40
            max_tags = 3

            [limits]
            default_title_max_len = 50

            [access.sessions.tok-alice]
            actor = "alice"
            docs = [1, 2]

            [access.sessions.tok-root]
            actor = "root"
            edit_all = true
            "#,
        )
        .unwrap();

        assert_eq!(config.base_segments(), vec!["api"]);
        assert_eq!(config.heuristic.summary_words, 40);
        assert_eq!(config.heuristic.min_tag_len, 5);
        assert_eq!(config.limits.default_title_max_len, 50);
        assert_eq!(config.limits.summary_snippet_chars, 6000);
        assert_eq!(config.access.actor_for("tok-alice"), Some("alice"));
        assert_eq!(config.access.actor_for("nope"), None);
    }

    #[test]
    fn http_provider_needs_endpoint() {
        let err = ServerConfig::from_toml("[generation]\nkind = \"http\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = ServerConfig::from_toml(
            "[generation]\nkind = \"http\"\nendpoint = \"http://localhost:1/v1/chat/completions\"\n",
        )
        .unwrap();
        assert_eq!(config.generation.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(matches!(
            ServerConfig::from_toml("[nope]\nx = 1\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn bad_listen_is_invalid() {
        let err = ServerConfig::from_toml("[server]\nlisten = \"localhost\"\n").unwrap_err();
        assert!(err.to_string().contains("server.listen"));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nmax_capacity = 16").unwrap();
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.max_capacity, 16);

        let err = ServerConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
