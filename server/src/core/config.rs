use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::path::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SESSION_TTL_HOURS,
    DEFAULT_TOPIC_CHANNEL_CAPACITY, MIN_JWT_SECRET_BYTES, SQLITE_MAX_CONNECTIONS,
};

// =============================================================================
// File Config Structs (JSON, every field optional)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Authentication configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub jwt_secret: Option<String>,
    pub session_ttl_hours: Option<u64>,
}

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub max_connections: Option<u32>,
}

/// Realtime configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RealtimeFileConfig {
    pub channel_capacity: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub realtime: Option<RealtimeFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
            tracing::warn!(
                fields = %keys.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            if auth.jwt_secret.is_some() {
                current.jwt_secret = auth.jwt_secret;
            }
            if auth.session_ttl_hours.is_some() {
                current.session_ttl_hours = auth.session_ttl_hours;
            }
        }

        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if database.max_connections.is_some() {
                current.max_connections = database.max_connections;
            }
        }

        if let Some(realtime) = other.realtime {
            let current = self.realtime.get_or_insert_with(RealtimeFileConfig::default);
            if realtime.channel_capacity.is_some() {
                current.channel_capacity = realtime.channel_capacity;
            }
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Configured signing secret. `None` means a per-process random key.
    pub jwt_secret: Option<String>,
    pub session_ttl_hours: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("session_ttl_hours", &self.session_ttl_hours)
            .finish()
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
}

/// Realtime configuration
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub channel_capacity: usize,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub realtime: RealtimeConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.tasksync/tasksync.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::from_layers(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            session_ttl_hours = config.auth.session_ttl_hours,
            jwt_secret_configured = config.auth.jwt_secret.is_some(),
            db_max_connections = config.database.max_connections,
            channel_capacity = config.realtime.channel_capacity,
            debug = config.debug,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Layer defaults, merged file config and CLI/env values
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();
        let file_realtime = file_config.realtime.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let jwt_secret = cli
            .jwt_secret
            .clone()
            .or(file_auth.jwt_secret)
            .filter(|s| !s.is_empty());
        let session_ttl_hours = cli
            .session_ttl_hours
            .or(file_auth.session_ttl_hours)
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);

        let max_connections = cli
            .db_max_connections
            .or(file_database.max_connections)
            .unwrap_or(SQLITE_MAX_CONNECTIONS);

        let channel_capacity = file_realtime
            .channel_capacity
            .unwrap_or(DEFAULT_TOPIC_CHANNEL_CAPACITY);

        // debug: CLI/env flag takes precedence, then file config, default false
        let debug = cli.debug || file_config.debug.unwrap_or(false);

        Self {
            server: ServerConfig { host, port },
            auth: AuthConfig {
                jwt_secret,
                session_ttl_hours,
            },
            database: DatabaseConfig { max_connections },
            realtime: RealtimeConfig { channel_capacity },
            debug,
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }
        if self.auth.session_ttl_hours == 0 {
            anyhow::bail!("Configuration error: auth.session_ttl_hours must be greater than 0");
        }
        if let Some(secret) = &self.auth.jwt_secret
            && secret.len() < MIN_JWT_SECRET_BYTES
        {
            anyhow::bail!(
                "Configuration error: auth.jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            );
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("Configuration error: database.max_connections must be greater than 0");
        }
        if self.realtime.channel_capacity == 0 {
            anyhow::bail!("Configuration error: realtime.channel_capacity must be greater than 0");
        }
        Ok(())
    }
}

/// Get the profile config path (~/.tasksync/tasksync.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "auth": { "session_ttl_hours": 12 },
            "database": { "max_connections": 3 },
            "realtime": { "channel_capacity": 64 },
            "debug": true
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(config.auth.as_ref().unwrap().session_ttl_hours, Some(12));
        assert_eq!(config.database.as_ref().unwrap().max_connections, Some(3));
        assert_eq!(config.realtime.as_ref().unwrap().channel_capacity, Some(64));
        assert_eq!(config.debug, Some(true));
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "port": 1 }, "sever": { "port": 2 } }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert!(config.extra.get("sever").is_some());
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig =
            serde_json::from_str(r#"{ "server": { "host": "a", "port": 1 } }"#).unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "server": { "port": 2 }, "debug": true }"#).unwrap();
        base.merge(overlay);

        let server = base.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("a"));
        assert_eq!(server.port, Some(2));
        assert_eq!(base.debug, Some(true));
    }

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::from_layers(&CliConfig::default(), FileConfig::default());

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.auth.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.database.max_connections, SQLITE_MAX_CONNECTIONS);
        assert!(!config.debug);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "server": { "host": "file.host", "port": 1000 }, "auth": { "session_ttl_hours": 5 } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            port: Some(3000),
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        let config = AppConfig::from_layers(&cli, file);

        assert_eq!(config.server.host, "file.host");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.session_ttl_hours, 5);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some(SECRET));
    }

    #[test]
    fn test_validation_rejects_short_secret() {
        let cli = CliConfig {
            jwt_secret: Some("short".to_string()),
            ..Default::default()
        };
        let config = AppConfig::from_layers(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = AppConfig::from_layers(&CliConfig::default(), FileConfig::default());
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_layers(&CliConfig::default(), FileConfig::default());
        config.auth.session_ttl_hours = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::from_layers(&CliConfig::default(), FileConfig::default());
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cli = CliConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        let config = AppConfig::from_layers(&cli, FileConfig::default());
        let rendered = format!("{:?}", config.auth);
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(!is_all_interfaces("127.0.0.1"));
    }
}
