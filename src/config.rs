use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::security::EncryptionKey;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/moustass.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// At-rest encryption key: base64 of exactly 32 bytes. Usually supplied
    /// via the MOUSTASS_ENCRYPTION_KEY environment variable rather than the
    /// config file. Generate one with `moustass-web generate-key`.
    pub encryption_key: String,

    /// HMAC secret for session tokens (MOUSTASS_JWT_SECRET).
    pub jwt_secret: String,

    /// Session token lifetime.
    pub token_ttl_hours: i64,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Access-log entries older than this are eligible for pruning.
    pub access_log_retention_days: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_key: String::new(),
            jwt_secret: String::new(),
            token_ttl_hours: 24,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            access_log_retention_days: 90,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Pick up a local .env before reading overrides.
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });

        config.apply_env_overrides();

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables take precedence over file values so secrets can
    /// stay out of config.toml.
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("MOUSTASS_DATABASE_PATH") {
            self.general.database_path = value;
        }
        if let Ok(value) = std::env::var("MOUSTASS_ENCRYPTION_KEY") {
            self.security.encryption_key = value;
        }
        if let Ok(value) = std::env::var("MOUSTASS_JWT_SECRET") {
            self.security.jwt_secret = value;
        }
        if let Ok(value) = std::env::var("MOUSTASS_PORT")
            && let Ok(port) = value.parse()
        {
            self.server.port = port;
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("moustass").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".moustass").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        EncryptionKey::from_base64(&self.security.encryption_key)
            .map_err(|e| anyhow::anyhow!("Invalid encryption key: {e}"))?;

        if self.security.jwt_secret.is_empty() {
            anyhow::bail!("JWT secret cannot be empty (set MOUSTASS_JWT_SECRET)");
        }

        if self.security.token_ttl_hours <= 0 {
            anyhow::bail!("Token lifetime must be positive");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.security.token_ttl_hours, 24);
        assert_eq!(config.security.access_log_retention_days, 90);
        assert!(config.security.encryption_key.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[security]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [security]
            token_ttl_hours = 12
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.security.token_ttl_hours, 12);

        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validate_rejects_missing_secrets() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.security.encryption_key = EncryptionKey::generate_base64();
        assert!(config.validate().is_err());

        config.security.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }
}
