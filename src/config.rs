use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./couponly.db"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// How long a cached coupon result set stays fresh, in seconds
    pub coupon_cache_ttl_secs: u64,

    /// How long a cached store result set stays fresh, in seconds
    pub store_cache_ttl_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let coupon_cache_ttl_secs = std::env::var("COUPON_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse::<u64>()
            .unwrap_or(30);

        let store_cache_ttl_secs = std::env::var("STORE_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse::<u64>()
            .unwrap_or(60);

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./couponly.db".into()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            coupon_cache_ttl_secs,
            store_cache_ttl_secs,
        })
    }
}
