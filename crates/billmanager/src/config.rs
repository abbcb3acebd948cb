use std::net::SocketAddr;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use billmanager_api::DEFAULT_MAX_UPLOAD_BYTES;
use billmanager_core::CreationFailurePolicy;
use serde::Deserialize;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Layout of the optional TOML configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    database_url: Option<String>,
    bind: Option<String>,
    max_connections: Option<u32>,
    max_upload_bytes: Option<usize>,
    import: ImportSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ImportSection {
    on_failure: Option<CreationFailurePolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind: SocketAddr,
    pub max_connections: u32,
    pub max_upload_bytes: usize,
    pub on_failure: CreationFailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            on_failure: CreationFailurePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file at `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read config file at '{}'", path.display())
                })?;
                Self::from_toml(&content).with_context(|| {
                    format!("Failed to parse config TOML from '{}'", path.display())
                })?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();

        config.database_url = file.database_url;
        if let Some(bind) = file.bind {
            config.bind = parse_bind(&bind)?;
        }
        if let Some(max_connections) = file.max_connections {
            config.max_connections = max_connections;
        }
        if let Some(max_upload_bytes) = file.max_upload_bytes {
            config.max_upload_bytes = max_upload_bytes;
        }
        if let Some(on_failure) = file.import.on_failure {
            config.on_failure = on_failure;
        }
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("BILLMANAGER_DATABASE_URL")) {
            self.database_url = Some(url);
        }
        if let Some(bind) = lookup("BILLMANAGER_BIND") {
            self.bind = parse_bind(&bind).context("BILLMANAGER_BIND")?;
        }
        if let Some(max) = lookup("BILLMANAGER_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = max
                .trim()
                .parse::<usize>()
                .with_context(|| format!("BILLMANAGER_MAX_UPLOAD_BYTES is not a byte count: '{max}'"))?;
        }
        if let Some(policy) = lookup("BILLMANAGER_IMPORT_ON_FAILURE") {
            self.on_failure = policy
                .parse::<CreationFailurePolicy>()
                .context("BILLMANAGER_IMPORT_ON_FAILURE")?;
        }
        Ok(())
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("DATABASE_URL (or BILLMANAGER_DATABASE_URL) must be set"))
    }
}

fn parse_bind(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid bind address '{value}'"))
}
