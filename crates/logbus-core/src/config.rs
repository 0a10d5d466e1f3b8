use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8890;
pub const DEFAULT_BIND: &str = "127.0.0.1";
/// Postgres NOTIFY channel the backend raises on log inserts.
pub const NOTIFY_CHANNEL: &str = "logs";
/// Per-connection delivery queue depth. A client that falls further behind
/// than this starts dropping notifications (logged, never blocking publish).
pub const DELIVERY_QUEUE_DEPTH: usize = 256;

/// Top-level config (logbus.toml + LOGBUS_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogbusConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Upper bound for the shared pool. The notification listener checks one
    /// connection out of this pool for its entire lifetime.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for LogbusConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_url() -> String {
    "postgres://localhost/logbus".to_string()
}
fn default_max_connections() -> u32 {
    10
}

impl LogbusConfig {
    /// Load config from a TOML file with LOGBUS_* env var overrides.
    ///
    /// Missing file is fine; env vars and serde defaults fill the gaps.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or("logbus.toml");

        let config: LogbusConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOGBUS_").split("_"))
            .extract()
            .map_err(|e| crate::error::LogbusError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_everything() {
        let config = LogbusConfig::default();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
        assert_eq!(config.gateway.bind, DEFAULT_BIND);
        assert!(config.database.url.starts_with("postgres://"));
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = LogbusConfig::load(Some("/nonexistent/logbus.toml")).unwrap();
        assert_eq!(config.gateway.port, DEFAULT_PORT);
    }

    #[test]
    fn env_overrides_gateway_port() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("LOGBUS_GATEWAY_PORT", "9999");
            let config = LogbusConfig::load(None).unwrap();
            assert_eq!(config.gateway.port, 9999);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "logbus.toml",
                r#"
                [gateway]
                bind = "0.0.0.0"

                [database]
                url = "postgres://db.internal/logs"
                "#,
            )?;
            let config = LogbusConfig::load(None).unwrap();
            assert_eq!(config.gateway.bind, "0.0.0.0");
            assert_eq!(config.database.url, "postgres://db.internal/logs");
            // untouched keys keep their defaults
            assert_eq!(config.gateway.port, DEFAULT_PORT);
            Ok(())
        });
    }
}
