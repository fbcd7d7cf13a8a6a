use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
    pub security: SecurityConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub json_max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid(format!("unknown store backend '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when `limit` is missing or not a positive integer
    pub default_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub access_token_secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_secret: String,
    pub refresh_token_expiry_days: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory served under `/media`
    pub public_dir: PathBuf,
    /// Absolute base used when building media URLs, e.g. `http://localhost:8000`
    pub public_base_url: String,
    /// Where multipart uploads are staged before being handed to media storage
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        override_from_env("HOST", &mut self.server.host);
        override_from_env("PORT", &mut self.server.port);
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        override_from_env("JSON_MAX_BYTES", &mut self.server.json_max_bytes);

        // Database overrides
        override_from_env("STORE_BACKEND", &mut self.database.backend);
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.trim().is_empty());
        }
        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_from_env("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);

        // Pagination overrides
        override_from_env("PAGINATION_DEFAULT_LIMIT", &mut self.pagination.default_limit);

        // Security overrides
        override_from_env("ACCESS_TOKEN_SECRET", &mut self.security.access_token_secret);
        override_from_env("ACCESS_TOKEN_EXPIRY_MINUTES", &mut self.security.access_token_expiry_minutes);
        override_from_env("REFRESH_TOKEN_SECRET", &mut self.security.refresh_token_secret);
        override_from_env("REFRESH_TOKEN_EXPIRY_DAYS", &mut self.security.refresh_token_expiry_days);
        override_from_env("SECURE_COOKIES", &mut self.security.secure_cookies);

        // Media overrides
        override_from_env("MEDIA_PUBLIC_DIR", &mut self.media.public_dir);
        override_from_env("MEDIA_PUBLIC_BASE_URL", &mut self.media.public_base_url);
        override_from_env("UPLOAD_TEMP_DIR", &mut self.media.upload_dir);
        override_from_env("UPLOAD_MAX_BYTES", &mut self.media.max_upload_bytes);

        self
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.access_token_secret.is_empty() {
            return Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"));
        }
        if self.security.refresh_token_secret.is_empty() {
            return Err(ConfigError::Missing("REFRESH_TOKEN_SECRET"));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.pagination.default_limit == 0 {
            return Err(ConfigError::Invalid("PAGINATION_DEFAULT_LIMIT must be positive".to_string()));
        }
        if self.security.access_token_expiry_minutes <= 0 || self.security.refresh_token_expiry_days <= 0 {
            return Err(ConfigError::Invalid("token expiry must be positive".to_string()));
        }
        url::Url::parse(&self.media.public_base_url)
            .map_err(|e| ConfigError::Invalid(format!("MEDIA_PUBLIC_BASE_URL: {}", e)))?;
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                json_max_bytes: 16 * 1024, // 16KB
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            pagination: PaginationConfig { default_limit: 10 },
            security: SecurityConfig {
                access_token_secret: "dev-access-token-secret".to_string(),
                access_token_expiry_minutes: 60 * 24, // 1 day
                refresh_token_secret: "dev-refresh-token-secret".to_string(),
                refresh_token_expiry_days: 10,
                secure_cookies: false,
            },
            media: MediaConfig {
                public_dir: PathBuf::from("public/media"),
                public_base_url: "http://localhost:8000".to_string(),
                upload_dir: PathBuf::from("public/temp"),
                max_upload_bytes: 100 * 1024 * 1024, // 100MB
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: vec!["https://staging.example.com".to_string()],
                json_max_bytes: 16 * 1024,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            pagination: PaginationConfig { default_limit: 10 },
            security: SecurityConfig {
                access_token_secret: String::new(),
                access_token_expiry_minutes: 60,
                refresh_token_secret: String::new(),
                refresh_token_expiry_days: 10,
                secure_cookies: true,
            },
            media: MediaConfig {
                public_dir: PathBuf::from("public/media"),
                public_base_url: "https://staging.example.com".to_string(),
                upload_dir: PathBuf::from("public/temp"),
                max_upload_bytes: 200 * 1024 * 1024, // 200MB
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: vec!["https://app.example.com".to_string()],
                json_max_bytes: 16 * 1024,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            pagination: PaginationConfig { default_limit: 10 },
            security: SecurityConfig {
                access_token_secret: String::new(),
                access_token_expiry_minutes: 15,
                refresh_token_secret: String::new(),
                refresh_token_expiry_days: 10,
                secure_cookies: true,
            },
            media: MediaConfig {
                public_dir: PathBuf::from("public/media"),
                public_base_url: "https://app.example.com".to_string(),
                upload_dir: PathBuf::from("public/temp"),
                max_upload_bytes: 500 * 1024 * 1024, // 500MB
            },
        }
    }
}

/// Replace `target` with the parsed value of `key` when it is set and parses
fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = env::var(key) {
        match raw.trim().parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!("Ignoring unparseable {}={:?}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.pagination.default_limit, 10);
        assert!(!config.security.secure_cookies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert!(config.security.secure_cookies);
        // Secrets and DATABASE_URL must come from the environment
        assert!(matches!(config.validate(), Err(ConfigError::Missing("ACCESS_TOKEN_SECRET"))));
    }

    #[test]
    fn validate_requires_database_url_for_postgres() {
        let mut config = AppConfig::development();
        config.database.backend = StoreBackend::Postgres;
        assert!(matches!(config.validate(), Err(ConfigError::Missing("DATABASE_URL"))));
        config.database.url = Some("postgres://localhost/vidtube".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_default_limit() {
        let mut config = AppConfig::development();
        config.pagination.default_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parses_store_backend() {
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }
}
