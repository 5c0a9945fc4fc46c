use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Default program, set by `use` and `new`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    /// One CIDR per line, used by `ips --filter-cdns`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn_filter_path: Option<String>,
    /// Reject IPs whose embedded domains are blacklisted.
    #[serde(default)]
    pub blacklist_embedded_domains: bool,
}

// Defaults
fn default_store_backend() -> String {
    "sqlite".to_string()
}
fn default_sqlite_path() -> String {
    "reconscope.db".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            program: None,
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            cdn_filter_path: None,
            blacklist_embedded_domains: false,
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if fs::try_exists(path.as_ref()).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            Ok(Self::default())
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }
        fs::write(path, contents)
            .await
            .context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.program, None);
        assert_eq!(config.store.backend, "sqlite");
        assert_eq!(config.store.sqlite_path, "reconscope.db");
        assert_eq!(config.logging.level, "info");
        assert!(!config.ingest.blacklist_embedded_domains);
    }

    #[test]
    fn test_parse_full() {
        let config = Config::parse(
            r#"
            program = "acme"

            [store]
            backend = "memory"

            [logging]
            level = "debug"
            format = "json"

            [ingest]
            cdn_filter_path = "/etc/cdn.txt"
            blacklist_embedded_domains = true
            "#,
        )
        .unwrap();
        assert_eq!(config.program.as_deref(), Some("acme"));
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.sqlite_path, "reconscope.db");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.ingest.cdn_filter_path.as_deref(), Some("/etc/cdn.txt"));
        assert!(config.ingest.blacklist_embedded_domains);
    }

    #[test]
    fn test_serialize_round_trip_keeps_program() {
        let mut config = Config::default();
        config.program = Some("acme".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.program.as_deref(), Some("acme"));
    }
}
