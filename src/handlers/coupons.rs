use crate::{
    cache, db, expiry,
    models::{Coupon, CouponRow},
    normalize, AppState,
};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};

const CACHE_CONTROL: &str = "public, s-maxage=30, stale-while-revalidate=60";

#[derive(Debug, Deserialize)]
pub struct CouponQuery {
    pub id: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,
    #[serde(rename = "storeId")]
    pub store_id: Option<String>,
    #[serde(rename = "activeOnly")]
    pub active_only: Option<String>,
    /// Cache-busting marker; any value forces a live query.
    #[serde(rename = "_t")]
    pub bust: Option<String>,
}

impl CouponQuery {
    fn cache_key(&self) -> String {
        format!(
            "id={}|category={}|store={}|active={}",
            cache::key_part(self.id.as_deref()),
            cache::key_part(self.category_id.as_deref()),
            cache::key_part(self.store_id.as_deref()),
            cache::key_part(self.active_only.as_deref()),
        )
    }

    fn wants_active_only(&self) -> bool {
        self.active_only.as_deref() == Some("true")
    }
}

/// GET /api/coupons/get
///
/// 1. Check the TTL cache under the composite filter key (unless `_t` is
///    present).
/// 2. On a miss, run the query pipeline: resolve → normalize → filter.
/// 3. Populate the cache and respond. Backend failures become the 500
///    envelope with empty defaults so clients can render without null checks.
pub async fn get_coupons(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CouponQuery>,
) -> Response {
    let key = query.cache_key();

    if query.bust.is_none() {
        if let Some(hit) = state.coupon_cache.get(&key) {
            return respond(&query, hit);
        }
    }

    match load_coupons(&state, &query).await {
        Ok(coupons) => {
            state.coupon_cache.set(key, coupons.clone());
            respond(&query, coupons)
        }
        Err(e) => {
            tracing::error!("failed to load coupons ({}): {:?}", key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to load coupons",
                    "coupons": [],
                    "coupon": null,
                })),
            )
                .into_response()
        }
    }
}

fn respond(query: &CouponQuery, coupons: Vec<Coupon>) -> Response {
    let body = if query.id.is_some() {
        json!({ "success": true, "coupon": coupons.first() })
    } else {
        json!({ "success": true, "coupons": coupons })
    };
    ([(header::CACHE_CONTROL, CACHE_CONTROL)], Json(body)).into_response()
}

async fn load_coupons(state: &AppState, query: &CouponQuery) -> Result<Vec<Coupon>, sqlx::Error> {
    // Direct id lookup: no list filters apply, a miss is an empty result.
    if let Some(id) = query.id.as_deref() {
        let Some(row) = db::get_coupon_by_id(&state.db, id).await? else {
            return Ok(Vec::new());
        };
        let names = db::store_names(&state.db, std::slice::from_ref(&row)).await;
        return Ok(vec![normalize::coupon_to_api(
            &row,
            authoritative_name(&row, &names),
        )]);
    }

    let filters = db::CouponFilters {
        store_ref: query.store_id.as_deref(),
        category_id: query.category_id.as_deref(),
    };
    let rows = db::list_coupons(&state.db, &filters).await?;
    let names = db::store_names(&state.db, &rows).await;

    // Rows matched by the scan heuristics can lack every indexed store
    // column; when the caller filtered by store, its resolved name fills
    // that gap.
    let requested_store = match query.store_id.as_deref() {
        Some(store_ref) => db::resolve_store_keys(&state.db, store_ref).await?.name,
        None => None,
    };

    let now = Utc::now();
    let mut coupons = Vec::with_capacity(rows.len());
    for row in &rows {
        if !expiry::is_unexpired(row.expires_at.as_deref(), now) {
            continue;
        }
        if query.wants_active_only() && !row.is_active {
            continue;
        }
        let name = authoritative_name(row, &names).or(requested_store.as_deref());
        coupons.push(normalize::coupon_to_api(row, name));
    }
    Ok(coupons)
}

/// Pick the enriched store name for a row, trying each identifier it carries.
fn authoritative_name<'a>(row: &CouponRow, names: &'a HashMap<String, String>) -> Option<&'a str> {
    for key in [row.store_uuid.as_deref(), row.legacy_store_id.as_deref()] {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            continue;
        };
        if let Some(name) = names.get(key) {
            return Some(name.as_str());
        }
    }
    None
}

// ── Admin update ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateCouponRequest {
    pub id: String,
    pub updates: serde_json::Map<String, serde_json::Value>,
}

/// POST /api/coupons/update
pub async fn update_coupon(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateCouponRequest>,
) -> Response {
    match db::update_coupon(&state.db, &req.id, &req.updates).await {
        Ok(()) => {
            state.coupon_cache.clear();
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => super::update_error_response(e, "coupon"),
    }
}
