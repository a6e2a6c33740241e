use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_CHANGES_LIMIT: u64 = 500;
pub const DEFAULT_CHANGE_RETENTION_MAX_ROWS: i64 = 10_000;
const DEFAULT_PG_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PG_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PG_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const DEFAULT_COUPLE_NAMES: &str = "Rasmi & Alex";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

/// Text shown on the visitor pages.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub couple_names: String,
    pub wedding_date: Option<String>,
}

// Service configuration sourced from environment variables, optionally
// overridden by a YAML file.
#[derive(Debug, Clone)]
pub struct InvitationsConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    // Base URL used to build shareable invitation links.
    pub public_url: String,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub changes_limit: u64,
    pub change_retention_max_rows: Option<i64>,
    // Optional YAML guest list loaded into an empty directory at startup.
    pub seed_file: Option<PathBuf>,
    pub site: SiteConfig,
}

#[derive(Debug, Default, Deserialize)]
struct InvitationsConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    public_url: Option<String>,
    storage_backend: Option<String>,
    postgres_url: Option<String>,
    postgres_max_connections: Option<u32>,
    postgres_connect_timeout_ms: Option<u64>,
    postgres_acquire_timeout_ms: Option<u64>,
    changes_limit: Option<u64>,
    change_retention_max_rows: Option<i64>,
    seed_file: Option<PathBuf>,
    couple_names: Option<String>,
    wedding_date: Option<String>,
}

impl InvitationsConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("INVITATIONS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse INVITATIONS_BIND")?;
        let metrics_bind = std::env::var("INVITATIONS_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse INVITATIONS_METRICS_BIND")?;
        let public_url = std::env::var("INVITATIONS_PUBLIC_URL")
            .unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string());
        let storage = match std::env::var("INVITATIONS_STORAGE_BACKEND") {
            Ok(value) => StorageBackend::parse(&value)
                .with_context(|| "parse INVITATIONS_STORAGE_BACKEND")?,
            Err(_) => StorageBackend::Memory,
        };
        let postgres = std::env::var("INVITATIONS_POSTGRES_URL")
            .ok()
            .map(|url| PostgresConfig {
                url,
                max_connections: env_number("INVITATIONS_POSTGRES_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_PG_MAX_CONNECTIONS),
                connect_timeout_ms: env_number("INVITATIONS_POSTGRES_CONNECT_TIMEOUT_MS")
                    .unwrap_or(DEFAULT_PG_CONNECT_TIMEOUT_MS),
                acquire_timeout_ms: env_number("INVITATIONS_POSTGRES_ACQUIRE_TIMEOUT_MS")
                    .unwrap_or(DEFAULT_PG_ACQUIRE_TIMEOUT_MS),
            });
        let changes_limit =
            env_number("INVITATIONS_CHANGES_LIMIT").unwrap_or(DEFAULT_CHANGES_LIMIT);
        let change_retention_max_rows = Some(
            env_number("INVITATIONS_CHANGE_RETENTION_MAX_ROWS")
                .unwrap_or(DEFAULT_CHANGE_RETENTION_MAX_ROWS),
        );
        let seed_file = std::env::var("INVITATIONS_SEED_FILE").ok().map(PathBuf::from);
        let site = SiteConfig {
            couple_names: std::env::var("INVITATIONS_COUPLE_NAMES")
                .unwrap_or_else(|_| DEFAULT_COUPLE_NAMES.to_string()),
            wedding_date: std::env::var("INVITATIONS_WEDDING_DATE").ok(),
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            public_url,
            storage,
            postgres,
            changes_limit,
            change_retention_max_rows,
            seed_file,
            site,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("INVITATIONS_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read INVITATIONS_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: InvitationsConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse invitations config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.public_url {
            self.public_url = value;
        }
        if let Some(value) = override_cfg.storage_backend {
            self.storage = StorageBackend::parse(&value).with_context(|| "parse storage_backend")?;
        }
        if let Some(url) = override_cfg.postgres_url {
            let base = self.postgres.take();
            self.postgres = Some(PostgresConfig {
                url,
                max_connections: base
                    .as_ref()
                    .map(|pg| pg.max_connections)
                    .unwrap_or(DEFAULT_PG_MAX_CONNECTIONS),
                connect_timeout_ms: base
                    .as_ref()
                    .map(|pg| pg.connect_timeout_ms)
                    .unwrap_or(DEFAULT_PG_CONNECT_TIMEOUT_MS),
                acquire_timeout_ms: base
                    .as_ref()
                    .map(|pg| pg.acquire_timeout_ms)
                    .unwrap_or(DEFAULT_PG_ACQUIRE_TIMEOUT_MS),
            });
        }
        if let Some(pg) = self.postgres.as_mut() {
            if let Some(value) = override_cfg.postgres_max_connections {
                pg.max_connections = value;
            }
            if let Some(value) = override_cfg.postgres_connect_timeout_ms {
                pg.connect_timeout_ms = value;
            }
            if let Some(value) = override_cfg.postgres_acquire_timeout_ms {
                pg.acquire_timeout_ms = value;
            }
        }
        if let Some(value) = override_cfg.changes_limit {
            self.changes_limit = value;
        }
        if let Some(value) = override_cfg.change_retention_max_rows {
            self.change_retention_max_rows = Some(value);
        }
        if let Some(value) = override_cfg.seed_file {
            self.seed_file = Some(value);
        }
        if let Some(value) = override_cfg.couple_names {
            self.site.couple_names = value;
        }
        if let Some(value) = override_cfg.wedding_date {
            self.site.wedding_date = Some(value);
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr + PartialOrd + Default>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .filter(|value| *value > T::default())
}
