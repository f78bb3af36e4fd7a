//! `tandem.toml` loading. Every key is optional; environment variables win
//! over the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tandem_engine::EngineConfig;
use thiserror::Error;

const CONFIG_FILE: &str = "tandem.toml";
const DATABASE_FILE: &str = "tandem.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid bind address {0:?}")]
    Bind(String),
    #[error("Invalid engine settings: {0}")]
    Engine(#[from] tandem_core::ReconcileError),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8788)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Defaults to `tandem.db` in the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub engine: EngineConfig,
}

fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "tandem", "Tandem").map(|d| d.data_dir().to_path_buf())
}

impl Config {
    /// Reads the file named by `TANDEM_CONFIG`, else `tandem.toml` in the data
    /// directory. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("TANDEM_CONFIG")
            .map(PathBuf::from)
            .or_else(|| data_dir().map(|d| d.join(CONFIG_FILE)));

        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };

        if let Ok(bind) = std::env::var("TANDEM_BIND") {
            config.server.bind = bind.parse().map_err(|_| ConfigError::Bind(bind))?;
        }
        if let Some(db) = std::env::var_os("TANDEM_DATABASE") {
            config.database.path = Some(PathBuf::from(db));
        }

        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            data_dir()
                .map(|d| d.join(DATABASE_FILE))
                .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
        })
    }
}
