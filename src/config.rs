use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Hold cache (Redis) configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Reservation lifecycle configuration.
///
/// The grace period bounds how long a temporary hold stays payable; the
/// expiry task fires after the grace period and only reverts holds older
/// than `grace - leeway`, so a task delivered marginally early never reverts
/// a hold whose cache entry is still live.
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    pub grace_minutes: i64,
    pub expiry_leeway_secs: i64,
    pub expiry_max_retries: u32,
    pub expiry_retry_backoff_secs: u64,
}

/// Search index collaborator configuration. `base_url = None` disables the
/// best-effort capacity push entirely.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub base_url: Option<String>,
    pub index: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub reservation: ReservationConfig,
    pub search: SearchConfig,
    pub log_level: String,
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32);
        let acquire_timeout_secs = env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 30u64);
        let idle_timeout_secs = env_parse("DATABASE_IDLE_TIMEOUT_SECS", 600u64); // 10 minutes
        let max_lifetime_secs = env_parse("DATABASE_MAX_LIFETIME_SECS", 1800u64); // 30 minutes
        let test_before_acquire = env_parse("DATABASE_TEST_BEFORE_ACQUIRE", true);

        // Validate configuration
        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/farebox".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());
        Self { url }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

impl ReservationConfig {
    pub fn from_env() -> Result<Self, String> {
        let grace_minutes = env_parse("RESERVATION_GRACE_MINUTES", 10i64);
        let expiry_leeway_secs = env_parse("RESERVATION_EXPIRY_LEEWAY_SECS", 10i64);
        let expiry_max_retries = env_parse("RESERVATION_EXPIRY_MAX_RETRIES", 5u32);
        let expiry_retry_backoff_secs = env_parse("RESERVATION_EXPIRY_RETRY_BACKOFF_SECS", 3u64);

        if grace_minutes < 0 {
            return Err("RESERVATION_GRACE_MINUTES must not be negative".to_string());
        }
        if expiry_leeway_secs < 0 {
            return Err("RESERVATION_EXPIRY_LEEWAY_SECS must not be negative".to_string());
        }

        Ok(Self {
            grace_minutes,
            expiry_leeway_secs,
            expiry_max_retries,
            expiry_retry_backoff_secs,
        })
    }

    /// Grace period as a chrono duration
    pub fn grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.grace_minutes)
    }

    /// Grace period as a std duration (cache TTL, scheduler delay)
    pub fn grace_std(&self) -> Duration {
        Duration::from_secs((self.grace_minutes * 60).max(0) as u64)
    }

    /// Minimum hold age for the revert task to act: grace minus leeway,
    /// clamped at zero.
    pub fn expiry_threshold(&self) -> chrono::Duration {
        let secs = (self.grace_minutes * 60 - self.expiry_leeway_secs).max(0);
        chrono::Duration::seconds(secs)
    }

    /// Backoff before retry `attempt` (1-based) of a failed revert.
    pub fn expiry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.expiry_retry_backoff_secs * attempt as u64)
    }
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            grace_minutes: 10,
            expiry_leeway_secs: 10,
            expiry_max_retries: 5,
            expiry_retry_backoff_secs: 3,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var("SEARCH_INDEX_URL").ok(),
            index: env::var("SEARCH_INDEX_NAME").unwrap_or_else(|_| "tickets".to_string()),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            index: "tickets".to_string(),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let redis = RedisConfig::from_env();
        let reservation = ReservationConfig::from_env()?;
        let search = SearchConfig::from_env();

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            redis,
            reservation,
            search,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            reservation: ReservationConfig::default(),
            search: SearchConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}
