use chrono::NaiveDateTime;
use serde::Serialize;

// ── Raw rows ───────────────────────────────────────────────────────────────
//
// The raw shapes mirror the tables exactly, including the quoted
// spreadsheet-import columns. They never leave the database layer; the
// normalizer turns them into the API types below.

/// A coupon record from the `coupons` table, column names as imported.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CouponRow {
    pub id: String,
    #[sqlx(rename = "Coupon Id")]
    pub legacy_id: Option<String>,
    pub store_uuid: Option<String>,
    #[sqlx(rename = "Store Id")]
    pub legacy_store_id: Option<String>,
    /// JSON array of mixed store identifiers (UUIDs and numeric ids).
    pub store_ids: Option<String>,
    pub store_name: Option<String>,
    pub code: Option<String>,
    pub coupon_type: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_value: Option<f64>,
    pub discount_type: Option<String>,
    pub max_uses: i64,
    pub current_uses: i64,
    pub is_active: bool,
    /// Raw expiry value; may be RFC 3339, a bare date, an epoch number, a
    /// Firestore-style `{"seconds": N}` object, or garbage.
    pub expires_at: Option<String>,
    pub affiliate_url: Option<String>,
    #[sqlx(rename = "Deep Link")]
    pub deep_link: Option<String>,
    pub deeplink: Option<String>,
    pub url: Option<String>,
    pub priority: i64,
    pub category_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A store record from the `stores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRow {
    pub id: String,
    #[sqlx(rename = "Store Id")]
    pub legacy_id: Option<String>,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub cdn_logo_url: Option<String>,
    pub website_url: Option<String>,
    pub tracking_url: Option<String>,
    pub network_id: Option<String>,
    pub category_id: Option<String>,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ── Normalized API shapes ──────────────────────────────────────────────────

/// The normalized coupon returned by `/api/coupons/get`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    /// The store reference as stored (UUID or legacy numeric id).
    pub store_id: Option<String>,
    /// Authoritative store name backfilled from the stores table; empty when
    /// the reference could not be resolved.
    pub store_name: String,
    pub code: Option<String>,
    pub coupon_type: String,
    pub title: String,
    pub description: Option<String>,
    pub discount_value: Option<f64>,
    pub discount_type: Option<String>,
    pub max_uses: i64,
    pub current_uses: i64,
    pub is_active: bool,
    /// RFC 3339 when the raw value parsed; the raw value otherwise.
    pub expires_at: Option<String>,
    /// Winner of the URL priority chain, scheme-normalized.
    pub url: Option<String>,
    pub priority: i64,
    pub category_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// The normalized store returned by `/api/stores/get`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: String,
    pub store_id: Option<String>,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub tracking_url: Option<String>,
    pub network_id: Option<String>,
    pub category_id: Option<String>,
    pub rating: Option<f64>,
    pub review_count: i64,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ── Content rows ───────────────────────────────────────────────────────────
//
// Pure content records; serialized as-is with camelCase keys.

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub name: String,
    pub network_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: String,
    pub title: String,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: Option<i64>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub banner_url: Option<String>,
    pub description: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub position: Option<i64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<String>,
    pub created_at: NaiveDateTime,
}
