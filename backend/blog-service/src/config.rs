/// Configuration management for Blog Service
///
/// Everything is read from environment variables (a `.env` file is loaded by
/// the binary before this runs).
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEV_SESSION_SECRET: &str = "dev-only-session-secret-change-me";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Feed, cache and form settings
    pub blog: BlogSettings,
    /// Media upload storage
    pub media: MediaConfig,
    /// Session cookie settings
    pub session: SessionConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

/// View-level settings shared by every handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogSettings {
    /// Page size for every paginated feed
    pub posts_per_page: usize,
    /// How long the rendered landing page stays cached
    pub index_cache_ttl_secs: u64,
    /// Where anonymous users are sent for login-only views
    pub login_url: String,
}

impl BlogSettings {
    pub fn index_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.index_cache_ttl_secs)
    }
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            index_cache_ttl_secs: 20,
            login_url: "/auth/login/".to_string(),
        }
    }
}

/// Media upload storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Filesystem directory uploads are written under
    pub root: String,
    /// Public URL prefix the presentation layer serves `root` from
    pub url: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub ttl_hours: i64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"[REDACTED]")
            .field("cookie_name", &self.cookie_name)
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SESSION_SECRET.to_string(),
            cookie_name: "sessionid".to_string(),
            ttl_hours: 24 * 14,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) if production => {
                return Err("DATABASE_URL must be set in production".to_string())
            }
            Err(_) => "postgres://localhost/blog".to_string(),
        };

        let session = {
            let secret = match std::env::var("SESSION_SECRET") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("SESSION_SECRET must be set in production".to_string())
                }
                Err(_) => DEV_SESSION_SECRET.to_string(),
            };

            if production && (secret.trim().is_empty() || secret == DEV_SESSION_SECRET) {
                return Err(
                    "SESSION_SECRET must be set to a non-default value in production".to_string(),
                );
            }

            SessionConfig {
                secret,
                cookie_name: std::env::var("SESSION_COOKIE_NAME")
                    .unwrap_or_else(|_| "sessionid".to_string()),
                ttl_hours: parse_env_or_default("SESSION_TTL_HOURS", 24 * 14)?,
            }
        };

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("BLOG_SERVICE_PORT", 8080)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_env_or_default("DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env_or_default("DB_MIN_CONNECTIONS", 2)?,
                connect_timeout_secs: parse_env_or_default("DB_CONNECT_TIMEOUT_SECS", 5)?,
                acquire_timeout_secs: parse_env_or_default("DB_ACQUIRE_TIMEOUT_SECS", 10)?,
                idle_timeout_secs: parse_env_or_default("DB_IDLE_TIMEOUT_SECS", 600)?,
                max_lifetime_secs: parse_env_or_default("DB_MAX_LIFETIME_SECS", 1800)?,
            },
            blog: BlogSettings {
                posts_per_page: match parse_env_or_default("POSTS_PER_PAGE", 10usize)? {
                    0 => return Err("POSTS_PER_PAGE must be greater than zero".to_string()),
                    n => n,
                },
                index_cache_ttl_secs: parse_env_or_default("INDEX_CACHE_TTL_SECS", 20)?,
                login_url: std::env::var("LOGIN_URL").unwrap_or_else(|_| "/auth/login/".to_string()),
            },
            media: MediaConfig {
                root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
                url: std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()),
            },
            session,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
