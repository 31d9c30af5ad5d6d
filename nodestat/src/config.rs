use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::{Deserialize, Serialize};

use crate::error::{StatError, StatResult};

const DEFAULT_CONFIG_NAME: &str = "nodestat.json";
const DEFAULT_SQLITE_NAME: &str = "drupal.sqlite";
const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
    Mysql { url: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    /// Log every SQL statement through the driver
    pub sql_logging: Option<bool>,
}

impl StatsConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            sql_logging: Some(false),
        }
    }

    /// Read `nodestat.json` from `base_dir`, writing a sqlite default there
    /// first if it does not exist
    pub fn load_or_init(base_dir: &Path) -> StatResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| StatError::config(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| StatError::config(format!("read config: {err}")))?;
            return serde_json::from_str(&raw)
                .map_err(|err| StatError::config(format!("parse config: {err}")));
        }
        let default = Self::default_sqlite(DEFAULT_SQLITE_NAME);
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| StatError::config(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| StatError::config(format!("write config: {err}")))?;
        Ok(default)
    }

    /// Build a config from `DATABASE_URL`
    pub fn from_env() -> StatResult<Self> {
        let url = std::env::var(DATABASE_URL_VAR)
            .map_err(|_| StatError::config(format!("{DATABASE_URL_VAR} is not set")))?;
        Self::from_url(&url)
    }

    pub fn from_url(url: &str) -> StatResult<Self> {
        let database = if let Some(path) = url.strip_prefix("sqlite://") {
            DatabaseConfig::Sqlite {
                path: Some(path.split('?').next().unwrap_or(path).to_string()),
            }
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseConfig::Postgres {
                url: url.to_string(),
            }
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            DatabaseConfig::Mysql {
                url: url.to_string(),
            }
        } else {
            return Err(StatError::config(format!("unsupported database url '{url}'")));
        };
        Ok(Self {
            database,
            pool: None,
            sql_logging: None,
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
            DatabaseConfig::Mysql { .. } => "mysql",
        }
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> StatResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path.clone().unwrap_or_else(|| DEFAULT_SQLITE_NAME.to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            _ => Err(StatError::config("config is not sqlite backend")),
        }
    }

    /// Connection url; relative sqlite paths resolve against `base_dir`
    pub fn connection_url(&self, base_dir: &Path) -> StatResult<String> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => {
                let path = self.sqlite_path(base_dir)?;
                Ok(format!("sqlite://{}?mode=rwc", path.display()))
            }
            DatabaseConfig::Postgres { url } | DatabaseConfig::Mysql { url } => Ok(url.clone()),
        }
    }

    pub fn connect_options(&self, base_dir: &Path) -> StatResult<ConnectOptions> {
        let mut options = ConnectOptions::new(self.connection_url(base_dir)?);
        if let Some(pool) = &self.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(ms));
            }
            if let Some(ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(ms));
            }
            if let Some(ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(ms));
            }
        }
        options.sqlx_logging(self.sql_logging.unwrap_or(false));
        Ok(options)
    }

    pub async fn connect(&self, base_dir: &Path) -> StatResult<DatabaseConnection> {
        let options = self.connect_options(base_dir)?;
        info!("connecting to {} database", self.backend_name());
        Database::connect(options)
            .await
            .map_err(|err| StatError::storage("connect", err))
    }
}
