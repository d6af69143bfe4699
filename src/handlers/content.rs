//! Read endpoints for the simple content tables: categories, regions,
//! banners, events, news. No behavioral logic beyond the events date-range
//! filter and the TLD-derived regions merge.

use crate::{db, expiry, models::Region, normalize, AppState};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

fn ok(body: serde_json::Value) -> Response {
    ([(header::CACHE_CONTROL, CACHE_CONTROL)], Json(body)).into_response()
}

fn failed(what: &str, e: sqlx::Error) -> Response {
    tracing::error!("failed to load {}: {:?}", what, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": format!("Failed to load {what}"), what: [] })),
    )
        .into_response()
}

/// GET /api/categories/get
pub async fn get_categories(State(state): State<Arc<AppState>>) -> Response {
    match db::list_categories(&state.db).await {
        Ok(categories) => ok(json!({ "success": true, "categories": categories })),
        Err(e) => failed("categories", e),
    }
}

/// GET /api/regions/get
///
/// Stored regions plus regions inferred from store website TLDs; inference
/// never duplicates a stored name.
pub async fn get_regions(State(state): State<Arc<AppState>>) -> Response {
    let mut regions = match db::list_regions(&state.db).await {
        Ok(r) => r,
        Err(e) => return failed("regions", e),
    };

    match db::store_website_urls(&state.db).await {
        Ok(urls) => {
            for url in urls {
                let Some(name) = normalize::region_from_tld(&url) else {
                    continue;
                };
                if regions.iter().any(|r| r.name.eq_ignore_ascii_case(name)) {
                    continue;
                }
                regions.push(Region {
                    id: format!("tld-{}", name.to_ascii_lowercase().replace(' ', "-")),
                    name: name.to_owned(),
                    network_id: None,
                });
            }
        }
        // Inference is a bonus; stored regions still go out.
        Err(e) => tracing::warn!("store website scan for region inference failed: {:?}", e),
    }

    ok(json!({ "success": true, "regions": regions }))
}

/// GET /api/banners/get
pub async fn get_banners(State(state): State<Arc<AppState>>) -> Response {
    match db::list_banners(&state.db).await {
        Ok(banners) => ok(json!({ "success": true, "banners": banners })),
        Err(e) => failed("banners", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(rename = "activeOnly")]
    pub active_only: Option<String>,
}

/// GET /api/events/get
pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Response {
    let mut events = match db::list_events(&state.db).await {
        Ok(e) => e,
        Err(e) => return failed("events", e),
    };

    if query.active_only.as_deref() == Some("true") {
        let now = Utc::now();
        events.retain(|ev| {
            // Same lenient bias as coupons: a date that fails to parse never
            // hides an event.
            let started = match expiry::parse_expiry(ev.starts_at.as_deref()) {
                expiry::ParsedExpiry::Date(dt) => dt <= now,
                _ => true,
            };
            started && expiry::is_unexpired(ev.ends_at.as_deref(), now)
        });
    }

    ok(json!({ "success": true, "events": events }))
}

/// GET /api/news/get
pub async fn get_news(State(state): State<Arc<AppState>>) -> Response {
    match db::list_news(&state.db).await {
        Ok(news) => ok(json!({ "success": true, "news": news })),
        Err(e) => failed("news", e),
    }
}
