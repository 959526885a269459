use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::filter::FilterOptions;

/// Ten years; larger lifetimes overflow timestamp arithmetic
pub const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 3600;
pub const MAX_JWT_EXPIRY_HOURS: u64 = MAX_LIFETIME_SECS / 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub query: QueryConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub ids: IdConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Externally visible origin, used to build upload URLs
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub max_page_size: Option<u64>,
    pub open_ended_between: bool,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_age_secs: u64,
    pub remember_me_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdConfig {
    pub min_digits: u32,
    pub max_digits: u32,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded objects are written to, served under `/public`
    pub root: PathBuf,
    pub default_avatar: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AppConfig {
    /// Profile defaults from `APP_ENV`, then the YAML file named by `APP_CONFIG_FILE`, then env overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::for_environment(Self::environment_from_env());

        if let Ok(path) = env::var("APP_CONFIG_FILE") {
            config = config.with_file(Path::new(&path))?;
        }

        Ok(config.with_overrides(|key| env::var(key).ok()))
    }

    /// Like `load` without the config file
    pub fn from_env() -> Self {
        Self::for_environment(Self::environment_from_env()).with_overrides(|key| env::var(key).ok())
    }

    fn environment_from_env() -> Environment {
        match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        }
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    pub fn with_file(self, path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.with_yaml(&text)
    }

    /// Overlay a partial YAML document; keys it does not mention keep their current value
    pub fn with_yaml(self, text: &str) -> Result<Self, ConfigError> {
        let overlay: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mut base = serde_yaml::to_value(&self)?;
        merge_yaml(&mut base, overlay);
        let config: Self = serde_yaml::from_value(base)?;
        Ok(config.clamped())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("SERVER_PUBLIC_URL") {
            self.server.public_url = v;
        }

        // Query overrides
        if let Some(v) = lookup("QUERY_MAX_PAGE_SIZE").and_then(|v| v.parse().ok()) {
            self.query.max_page_size = Some(v);
        }
        parse_into(&lookup, "QUERY_OPEN_ENDED_BETWEEN", &mut self.query.open_ended_between);
        parse_into(&lookup, "QUERY_DEBUG_LOGGING", &mut self.query.debug_logging);

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(v);
        }
        parse_into(&lookup, "DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);

        // Session overrides
        parse_into(&lookup, "SESSION_MAX_AGE_SECS", &mut self.session.max_age_secs);
        parse_into(&lookup, "SESSION_REMEMBER_ME_SECS", &mut self.session.remember_me_secs);
        parse_into(&lookup, "SESSION_SWEEP_INTERVAL_SECS", &mut self.session.sweep_interval_secs);

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        parse_into(&lookup, "SECURITY_JWT_EXPIRY_HOURS", &mut self.security.jwt_expiry_hours);
        parse_into(&lookup, "SECURITY_ENABLE_CORS", &mut self.security.enable_cors);
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        // Id overrides
        parse_into(&lookup, "IDS_MIN_DIGITS", &mut self.ids.min_digits);
        parse_into(&lookup, "IDS_MAX_DIGITS", &mut self.ids.max_digits);
        parse_into(&lookup, "IDS_MAX_ATTEMPTS", &mut self.ids.max_attempts);

        // Storage overrides
        if let Some(v) = lookup("STORAGE_ROOT") {
            self.storage.root = PathBuf::from(v);
        }
        if let Some(v) = lookup("STORAGE_DEFAULT_AVATAR") {
            self.storage.default_avatar = v;
        }

        self.clamped()
    }

    fn clamped(mut self) -> Self {
        clamp_to(&mut self.session.max_age_secs, MAX_LIFETIME_SECS, "session.max_age_secs");
        clamp_to(&mut self.session.remember_me_secs, MAX_LIFETIME_SECS, "session.remember_me_secs");
        clamp_to(&mut self.security.jwt_expiry_hours, MAX_JWT_EXPIRY_HOURS, "security.jwt_expiry_hours");
        self
    }

    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            max_page_size: self.query.max_page_size,
            open_ended_between: self.query.open_ended_between,
            debug_logging: self.query.debug_logging,
        }
    }

    /// Base URL uploaded objects are served from
    pub fn public_files_url(&self) -> String {
        format!("{}/public", self.server.public_url.trim_end_matches('/'))
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
            },
            query: QueryConfig {
                max_page_size: Some(1000),
                open_ended_between: false,
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
            },
            session: SessionConfig {
                max_age_secs: 24 * 3600, // 1 day
                remember_me_secs: 30 * 24 * 3600,
                sweep_interval_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: "blog-api-dev-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:8000".to_string()],
            },
            ids: IdConfig {
                min_digits: 6,
                max_digits: 10,
                max_attempts: 5,
            },
            storage: StorageConfig {
                root: PathBuf::from("public"),
                default_avatar: "http://localhost:3000/public/avatar/default_avatar.png".to_string(),
            },
        }
    }

    fn staging() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Staging,
            query: QueryConfig {
                max_page_size: Some(500),
                open_ended_between: false,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ..dev
        }
    }

    fn production() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Production,
            query: QueryConfig {
                max_page_size: Some(100),
                open_ended_between: false,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
            },
            session: SessionConfig {
                sweep_interval_secs: 300,
                ..dev.session.clone()
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            ..dev
        }
    }
}

fn parse_into<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(parsed) = lookup(key).and_then(|v| v.parse().ok()) {
        *target = parsed;
    }
}

fn clamp_to(value: &mut u64, max: u64, key: &str) {
    if *value > max {
        warn!("{} = {} exceeds {}, clamping", key, value, max);
        *value = max;
    }
}

fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base), serde_yaml::Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// Load and install the process-wide config. Later calls return the installed value.
pub fn init() -> Result<&'static AppConfig, ConfigError> {
    CONFIG.get_or_try_init(AppConfig::load)
}

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::from_env)
}
