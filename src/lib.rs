pub mod cache;
pub mod config;
pub mod db;
pub mod expiry;
pub mod handlers;
pub mod models;
pub mod normalize;

use std::{sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use cache::TtlCache;
use models::{Coupon, Store};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::trace::TraceLayer;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: config::AppConfig,
    /// TTL cache for computed coupon result sets, keyed by the composite
    /// filter string. One instance per resource type, not a shared LRU.
    pub coupon_cache: TtlCache<Vec<Coupon>>,
    pub store_cache: TtlCache<Vec<Store>>,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: config::AppConfig) -> Self {
        let coupon_cache = TtlCache::new(Duration::from_secs(config.coupon_cache_ttl_secs));
        let store_cache = TtlCache::new(Duration::from_secs(config.store_cache_ttl_secs));
        Self {
            db,
            config,
            coupon_cache,
            store_cache,
        }
    }
}

// ── Construction ───────────────────────────────────────────────────────────

/// Open the SQLite pool (creating the file if needed) and run embedded
/// migrations.
pub async fn connect_db(database_url: &str) -> anyhow::Result<sqlx::SqlitePool> {
    let db = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(
            database_url
                .parse::<sqlx::sqlite::SqliteConnectOptions>()?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .foreign_keys(true),
        )
        .await?;

    sqlx::migrate!("./migrations").run(&db).await?;
    Ok(db)
}

/// Build the full router. Kept out of `main` so integration tests can drive
/// the application with `tower::ServiceExt::oneshot`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check — returns 200 OK with no auth required
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/api/coupons/get", get(handlers::coupons::get_coupons))
        .route("/api/coupons/update", post(handlers::coupons::update_coupon))
        .route("/api/stores/get", get(handlers::stores::get_stores))
        .route("/api/stores/update", post(handlers::stores::update_store))
        .route("/api/categories/get", get(handlers::content::get_categories))
        .route("/api/regions/get", get(handlers::content::get_regions))
        .route("/api/banners/get", get(handlers::content::get_banners))
        .route("/api/events/get", get(handlers::content::get_events))
        .route("/api/news/get", get(handlers::content::get_news))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
