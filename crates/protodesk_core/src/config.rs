//! Editor configuration loaded from TOML.
//!
//! # Responsibility
//! - Describe the document location, logging and generated-output settings.
//! - Carry the server naming table used by [`crate::naming`].
//!
//! # Invariants
//! - A loaded config has passed [`EditorConfig::validate`].
//! - Server full names are unique and at most one server is the client.
//!
//! Example:
//!
//! ```toml
//! document_path = "schema/proto.xml"
//! log_level = "info"
//!
//! [gen_proto]
//! relative = "out/proto"
//!
//! [[server]]
//! full_name = "GameServer"
//! client_short = "G"
//! server_short = "Game"
//! ```

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    /// Parsed fine but violates a config rule.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Output directory for one generation step.
///
/// `absolute` wins when it exists on disk; otherwise `relative` is resolved
/// against the work root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirs {
    pub absolute: Option<PathBuf>,
    pub relative: Option<PathBuf>,
}

impl OutputDirs {
    /// First configured directory that exists, or `None`.
    pub fn resolve(&self, work_root: &Path) -> Option<PathBuf> {
        if let Some(absolute) = self
            .absolute
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty() && path.exists())
        {
            return Some(absolute.clone());
        }
        self.relative
            .as_ref()
            .map(|relative| work_root.join(relative))
            .filter(|path| path.exists())
    }
}

/// One row of the server naming table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAlias {
    pub full_name: String,
    /// Short name used in client-facing protocol prefixes.
    pub client_short: String,
    /// Short name used in server-to-server protocol prefixes.
    pub server_short: String,
    #[serde(default)]
    pub is_client: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Schema document opened at startup.
    pub document_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub gen_proto: OutputDirs,
    pub gen_pb: OutputDirs,
    #[serde(rename = "server")]
    pub servers: Vec<ServerAlias>,
}

impl EditorConfig {
    /// Reads, parses and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = &self.log_level {
            normalize_level(level).map_err(ConfigError::Invalid)?;
        }

        let mut full_names = HashSet::new();
        for server in &self.servers {
            if server.full_name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "server full_name must not be blank".to_string(),
                ));
            }
            if !full_names.insert(server.full_name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate server `{}`",
                    server.full_name
                )));
            }
            if server.client_short.is_empty() || server.server_short.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "server `{}` needs both short names",
                    server.full_name
                )));
            }
        }

        let clients = self.servers.iter().filter(|server| server.is_client).count();
        if clients > 1 {
            return Err(ConfigError::Invalid(format!(
                "{clients} servers are marked is_client; expected at most one"
            )));
        }
        Ok(())
    }

    /// Configured log level, falling back to the build-mode default.
    pub fn effective_log_level(&self) -> &'static str {
        self.log_level
            .as_deref()
            .and_then(|level| normalize_level(level).ok())
            .unwrap_or_else(default_log_level)
    }
}
