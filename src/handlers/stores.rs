use crate::{cache, db, models::Store, normalize, AppState};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

#[derive(Debug, Deserialize)]
pub struct StoreQuery {
    /// UUID or legacy numeric "Store Id"; both resolve to the same entity.
    pub id: Option<String>,
    pub slug: Option<String>,
    #[serde(rename = "networkId")]
    pub network_id: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,
    #[serde(rename = "_t")]
    pub bust: Option<String>,
}

impl StoreQuery {
    fn cache_key(&self) -> String {
        format!(
            "id={}|slug={}|network={}|category={}",
            cache::key_part(self.id.as_deref()),
            cache::key_part(self.slug.as_deref()),
            cache::key_part(self.network_id.as_deref()),
            cache::key_part(self.category_id.as_deref()),
        )
    }

    fn is_single(&self) -> bool {
        self.id.is_some() || self.slug.is_some()
    }
}

/// GET /api/stores/get
pub async fn get_stores(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoreQuery>,
) -> Response {
    let key = query.cache_key();

    if query.bust.is_none() {
        if let Some(hit) = state.store_cache.get(&key) {
            return respond(&query, hit);
        }
    }

    match load_stores(&state, &query).await {
        Ok(stores) => {
            state.store_cache.set(key, stores.clone());
            respond(&query, stores)
        }
        Err(e) => {
            tracing::error!("failed to load stores ({}): {:?}", key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to load stores",
                    "stores": [],
                    "store": null,
                })),
            )
                .into_response()
        }
    }
}

fn respond(query: &StoreQuery, stores: Vec<Store>) -> Response {
    let body = if query.is_single() {
        json!({ "success": true, "store": stores.first() })
    } else {
        json!({ "success": true, "stores": stores })
    };
    ([(header::CACHE_CONTROL, CACHE_CONTROL)], Json(body)).into_response()
}

async fn load_stores(state: &AppState, query: &StoreQuery) -> Result<Vec<Store>, sqlx::Error> {
    if let Some(id) = query.id.as_deref() {
        let row = db::get_store(&state.db, id).await?;
        return Ok(row.iter().map(normalize::store_to_api).collect());
    }
    if let Some(slug) = query.slug.as_deref() {
        let row = db::get_store_by_slug(&state.db, slug).await?;
        return Ok(row.iter().map(normalize::store_to_api).collect());
    }

    let rows = db::list_stores(
        &state.db,
        query.network_id.as_deref(),
        query.category_id.as_deref(),
    )
    .await?;
    Ok(rows.iter().map(normalize::store_to_api).collect())
}

// ── Admin update ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub id: String,
    pub updates: serde_json::Map<String, serde_json::Value>,
}

/// POST /api/stores/update
///
/// Clears both caches on success: the store cache for the obvious reason,
/// the coupon cache because coupon responses carry backfilled store names.
pub async fn update_store(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateStoreRequest>,
) -> Response {
    match db::update_store(&state.db, &req.id, &req.updates).await {
        Ok(()) => {
            state.store_cache.clear();
            state.coupon_cache.clear();
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => super::update_error_response(e, "store"),
    }
}
