//! Layered configuration for quire.
//!
//! Values are merged from, in increasing priority:
//! 1. built-in defaults,
//! 2. an optional TOML, YAML or JSON file,
//! 3. `QUIRE_`-prefixed environment variables, with `__` separating nested
//!    keys (`QUIRE_READER__PREFIX_CAP_BYTES=1048576`).

pub mod error;

use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Bytes of a structureless document that are read, decoded and cached.
pub const DEFAULT_PREFIX_CAP_BYTES: usize = 512 * 1024;
const ENV_PREFIX: &str = "QUIRE_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub reader: ReaderConfig,
}

/// Where the two cache databases live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: PathBuf,
    /// File name of the content cache, relative to `directory`.
    pub content_database: String,
    /// File name of the reading-state store, relative to `directory`.
    pub state_database: String,
}
impl Default for CacheConfig {
    fn default() -> Self {
        let directory = directories::ProjectDirs::from("", "", "quire")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".quire"));
        Self {
            directory,
            content_database: "content.sqlite".to_string(),
            state_database: "state.sqlite".to_string(),
        }
    }
}
impl CacheConfig {
    pub fn content_path(&self) -> PathBuf {
        self.directory.join(&self.content_database)
    }

    pub fn state_path(&self) -> PathBuf {
        self.directory.join(&self.state_database)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Prefix served for documents without any detectable chapter structure.
    pub prefix_cap_bytes: usize,
    pub max_cache_connections: u32,
}
impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            prefix_cap_bytes: DEFAULT_PREFIX_CAP_BYTES,
            max_cache_connections: 5,
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional file, and the environment.
    ///
    /// The file format is picked from its extension (`toml`, `yaml`/`yml`,
    /// `json`). A file that is named but missing is an error rather than
    /// silently ignored.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(file_provider(path)?);
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        tracing::debug!(cache = %config.cache.directory.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check values that deserialize fine but can't be used.
    pub fn validate(&self) -> Result<()> {
        if self.reader.prefix_cap_bytes == 0 {
            exn::bail!(ErrorKind::Validation("reader.prefix_cap_bytes", "must be greater than zero".to_string()));
        }
        if self.reader.max_cache_connections == 0 {
            exn::bail!(ErrorKind::Validation(
                "reader.max_cache_connections",
                "must be greater than zero".to_string()
            ));
        }
        for (key, name) in [
            ("cache.content_database", &self.cache.content_database),
            ("cache.state_database", &self.cache.state_database),
        ] {
            if name.trim().is_empty() {
                exn::bail!(ErrorKind::Validation(key, "must not be empty".to_string()));
            }
        }
        if self.cache.content_database == self.cache.state_database {
            exn::bail!(ErrorKind::Validation(
                "cache.state_database",
                format!("must differ from cache.content_database ({})", self.cache.content_database)
            ));
        }
        Ok(())
    }
}

fn file_provider(path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    let figment = match extension.as_deref() {
        Some("toml") => Figment::from(Toml::file_exact(path)),
        Some("yaml" | "yml") => Figment::from(Yaml::file_exact(path)),
        Some("json") => Figment::from(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    };
    Ok(figment)
}
