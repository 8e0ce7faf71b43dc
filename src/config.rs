use std::{fmt::Display, str::FromStr, time::Duration};

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub migrate: bool,
    pub db_max_connections: u32,
    pub store_timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_shards: usize,
    pub cache_sweep_interval: Option<Duration>,
    pub request_timeout: Duration,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_shards: usize = try_load(&lookup, "CACHE_SHARDS", "16")?;
        if cache_shards == 0 {
            return Err(AppError::EnvError("CACHE_SHARDS must be at least 1".into()));
        }

        let sweep_secs: Option<u64> = lookup("CACHE_SWEEP_SECS")
            .map(|raw| parse("CACHE_SWEEP_SECS", &raw))
            .transpose()?;

        Ok(Self {
            port: try_load(&lookup, "PORT", "3001")?,
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            migrate: try_load(&lookup, "MIGRATE", "true")?,
            db_max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", "10")?,
            store_timeout: Duration::from_millis(try_load(&lookup, "STORE_TIMEOUT_MS", "1000")?),
            cache_ttl: Duration::from_secs(try_load(&lookup, "CACHE_TTL_SECS", "30")?),
            cache_shards,
            cache_sweep_interval: sweep_secs.filter(|s| *s > 0).map(Duration::from_secs),
            request_timeout: Duration::from_secs(try_load(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                "10",
            )?),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| AppError::EnvError(format!("{key} must be set")))
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &raw)
}

fn parse<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::EnvError(format!("Invalid {key} value '{raw}': {e}")))
}
