use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Token lifetime, e.g. `24h` or `1h30m`. Parsed on every issue.
    /// Read from `JWT_EXPIRATION`, with `JWT_TTL` as a fallback.
    pub ttl: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoIpConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub geoip: GeoIpConfig,
    pub app_host: String,
    pub app_port: u16,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                var_or("DB_USER", "user"),
                var_or("DB_PASSWORD", "password"),
                var_or("DB_HOST", "localhost"),
                var_or("DB_PORT", "5432"),
                var_or("DB_NAME", "users"),
            ),
        };

        let secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let jwt = JwtConfig {
            secret,
            ttl: get("JWT_EXPIRATION")
                .or_else(|| get("JWT_TTL"))
                .unwrap_or_else(|| "24h".to_string()),
        };

        let geoip = GeoIpConfig {
            base_url: var_or("GEOIP_URL", "http://ip-api.com/json"),
            timeout_secs: parse_or(&get, "GEOIP_TIMEOUT_SECS", 5)?,
        };
        anyhow::ensure!(geoip.timeout_secs > 0, "GEOIP_TIMEOUT_SECS must be positive");

        let request_timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", 15)?;
        anyhow::ensure!(request_timeout_secs > 0, "REQUEST_TIMEOUT_SECS must be positive");

        Ok(Self {
            database_url,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            jwt,
            geoip,
            app_host: var_or("APP_HOST", "0.0.0.0"),
            app_port: parse_or(&get, "APP_PORT", 8080)?,
            request_timeout_secs,
        })
    }
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
