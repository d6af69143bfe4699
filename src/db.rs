use crate::models::{Banner, Category, CouponRow, Event, NewsItem, Region, StoreRow};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

// Shared SELECT lists so the quoted import columns are spelled in one place.
const COUPON_COLS: &str = r#"id, "Coupon Id", store_uuid, "Store Id", store_ids, store_name,
    code, coupon_type, title, description, discount_value, discount_type,
    max_uses, current_uses, is_active, expires_at,
    affiliate_url, "Deep Link", deeplink, url,
    priority, category_id, created_at, updated_at"#;

const STORE_COLS: &str = r#"id, "Store Id", name, slug, logo_url, cdn_logo_url,
    website_url, tracking_url, network_id, category_id, rating, review_count,
    seo_title, seo_description, is_active, created_at, updated_at"#;

/// True when an identifier is UUID-shaped (as opposed to a legacy numeric
/// "Store Id" from the spreadsheet import).
pub fn is_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

// ── Coupons ────────────────────────────────────────────────────────────────

/// Fetch a single coupon: primary key first, then the legacy "Coupon Id"
/// column. A miss on both is `None`, never an error.
pub async fn get_coupon_by_id(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<CouponRow>, sqlx::Error> {
    let sql = format!("SELECT {COUPON_COLS} FROM coupons WHERE id = ?1");
    if let Some(row) = sqlx::query_as::<_, CouponRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
    {
        return Ok(Some(row));
    }

    let sql = format!(r#"SELECT {COUPON_COLS} FROM coupons WHERE "Coupon Id" = ?1"#);
    sqlx::query_as::<_, CouponRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Filters accepted by the coupon list query.
#[derive(Debug, Default)]
pub struct CouponFilters<'a> {
    pub store_ref: Option<&'a str>,
    pub category_id: Option<&'a str>,
}

pub async fn list_coupons(
    pool: &SqlitePool,
    filters: &CouponFilters<'_>,
) -> Result<Vec<CouponRow>, sqlx::Error> {
    if let Some(store_ref) = filters.store_ref {
        let mut rows = coupons_for_store(pool, store_ref).await?;
        if let Some(cat) = filters.category_id {
            rows.retain(|r| r.category_id.as_deref() == Some(cat));
        }
        return Ok(rows);
    }

    if let Some(cat) = filters.category_id {
        let sql = format!(
            "SELECT {COUPON_COLS} FROM coupons WHERE category_id = ?1
             ORDER BY priority DESC, created_at DESC"
        );
        return sqlx::query_as::<_, CouponRow>(&sql)
            .bind(cat)
            .fetch_all(pool)
            .await;
    }

    let sql = format!("SELECT {COUPON_COLS} FROM coupons ORDER BY priority DESC, created_at DESC");
    sqlx::query_as::<_, CouponRow>(&sql).fetch_all(pool).await
}

// ── Store-id reconciliation ────────────────────────────────────────────────

/// Every identifier we know for one store. Built once per request, then fed
/// to the resolution strategies below.
#[derive(Debug, Default, Clone)]
pub struct StoreKeys {
    pub uuid: Option<String>,
    pub legacy_id: Option<String>,
    pub name: Option<String>,
}

/// Expand a caller-supplied store reference (UUID or legacy numeric id) into
/// the full key set by consulting the stores table. A store that cannot be
/// found still yields keys with whatever the caller gave us.
pub async fn resolve_store_keys(
    pool: &SqlitePool,
    store_ref: &str,
) -> Result<StoreKeys, sqlx::Error> {
    if is_uuid(store_ref) {
        let store = get_store_by_uuid(pool, store_ref).await?;
        return Ok(match store {
            Some(s) => StoreKeys {
                uuid: Some(store_ref.to_owned()),
                legacy_id: s.legacy_id,
                name: Some(s.name),
            },
            None => StoreKeys {
                uuid: Some(store_ref.to_owned()),
                ..StoreKeys::default()
            },
        });
    }

    let store = get_store_by_legacy_id(pool, store_ref).await?;
    Ok(match store {
        Some(s) => StoreKeys {
            uuid: Some(s.id),
            legacy_id: Some(store_ref.to_owned()),
            name: Some(s.name),
        },
        None => StoreKeys {
            legacy_id: Some(store_ref.to_owned()),
            ..StoreKeys::default()
        },
    })
}

/// Resolution strategies for "coupons belonging to this store", tried in
/// order until one returns rows. The data was imported from spreadsheets
/// with inconsistent identifier conventions, so the indexed query can come
/// up empty for a store that does have coupons.
#[derive(Debug, Clone, Copy)]
enum StoreCouponStrategy {
    /// OR query across the indexed identifier columns.
    IndexedColumns,
    /// Fetch everything and apply the heuristic matcher in application code.
    ScanHeuristics,
}

const STORE_COUPON_STRATEGIES: [StoreCouponStrategy; 2] = [
    StoreCouponStrategy::IndexedColumns,
    StoreCouponStrategy::ScanHeuristics,
];

pub async fn coupons_for_store(
    pool: &SqlitePool,
    store_ref: &str,
) -> Result<Vec<CouponRow>, sqlx::Error> {
    let keys = resolve_store_keys(pool, store_ref).await?;

    for strategy in STORE_COUPON_STRATEGIES {
        let rows = match strategy {
            StoreCouponStrategy::IndexedColumns => {
                let legacy = keys.legacy_id.as_deref().unwrap_or(store_ref);
                let sql = format!(
                    r#"SELECT {COUPON_COLS} FROM coupons
                       WHERE "Store Id" = ?1 OR store_uuid = ?1
                          OR "Store Id" = ?2 OR store_uuid = ?2
                       ORDER BY priority DESC, created_at DESC"#
                );
                sqlx::query_as::<_, CouponRow>(&sql)
                    .bind(store_ref)
                    .bind(legacy)
                    .fetch_all(pool)
                    .await?
            }
            StoreCouponStrategy::ScanHeuristics => {
                tracing::warn!(
                    store_ref,
                    "indexed store-coupon query empty, falling back to full scan"
                );
                let sql = format!(
                    "SELECT {COUPON_COLS} FROM coupons ORDER BY priority DESC, created_at DESC"
                );
                let all = sqlx::query_as::<_, CouponRow>(&sql).fetch_all(pool).await?;
                all.into_iter()
                    .filter(|row| coupon_matches_store(row, &keys))
                    .collect()
            }
        };

        if !rows.is_empty() {
            return Ok(rows);
        }
    }

    Ok(Vec::new())
}

/// Heuristic correspondence between a coupon row and a store's key set:
/// legacy numeric id match, identifier contained in the row's `store_ids`
/// JSON array, or case-insensitive store-name equality. Inherited from the
/// inconsistent import data; array containment and name equality are proxies
/// for "same store", not verified business rules.
pub fn coupon_matches_store(row: &CouponRow, keys: &StoreKeys) -> bool {
    if let (Some(legacy), Some(row_legacy)) = (keys.legacy_id.as_deref(), row.legacy_store_id.as_deref())
    {
        if legacy == row_legacy.trim() {
            return true;
        }
    }

    if let Some(raw) = row.store_ids.as_deref() {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
            for item in items {
                let item = match item {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    _ => continue,
                };
                if keys.uuid.as_deref() == Some(item.as_str())
                    || keys.legacy_id.as_deref() == Some(item.as_str())
                {
                    return true;
                }
            }
        }
    }

    if let (Some(name), Some(row_name)) = (keys.name.as_deref(), row.store_name.as_deref()) {
        if name.eq_ignore_ascii_case(row_name.trim()) {
            return true;
        }
    }

    false
}

/// Resolve the authoritative store name for every store reference in a batch
/// of coupon rows. Returns a map keyed by the identifier as it appears on
/// the rows. Lookup failures are logged and skipped so one bad reference
/// never sinks the whole response.
pub async fn store_names(pool: &SqlitePool, rows: &[CouponRow]) -> HashMap<String, String> {
    let mut names: HashMap<String, String> = HashMap::new();
    let mut missed: Vec<String> = Vec::new();

    for row in rows {
        for key in [row.store_uuid.as_deref(), row.legacy_store_id.as_deref()] {
            let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
                continue;
            };
            if names.contains_key(key) || missed.iter().any(|m| m.as_str() == key) {
                continue;
            }
            match lookup_store_name(pool, key).await {
                Ok(Some(name)) => {
                    names.insert(key.to_owned(), name);
                }
                Ok(None) => missed.push(key.to_owned()),
                Err(e) => {
                    tracing::warn!("store name lookup failed for '{}': {:?}", key, e);
                    missed.push(key.to_owned());
                }
            }
        }
    }

    names
}

async fn lookup_store_name(pool: &SqlitePool, key: &str) -> Result<Option<String>, sqlx::Error> {
    let sql = if is_uuid(key) {
        "SELECT name FROM stores WHERE id = ?1"
    } else {
        r#"SELECT name FROM stores WHERE "Store Id" = ?1"#
    };
    sqlx::query_scalar(sql).bind(key).fetch_optional(pool).await
}

// ── Stores ─────────────────────────────────────────────────────────────────

pub async fn get_store_by_uuid(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<StoreRow>, sqlx::Error> {
    let sql = format!("SELECT {STORE_COLS} FROM stores WHERE id = ?1");
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_store_by_legacy_id(
    pool: &SqlitePool,
    legacy_id: &str,
) -> Result<Option<StoreRow>, sqlx::Error> {
    let sql = format!(r#"SELECT {STORE_COLS} FROM stores WHERE "Store Id" = ?1"#);
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(legacy_id)
        .fetch_optional(pool)
        .await
}

/// Fetch a store by either identifier form: UUID primary key first, legacy
/// numeric id second. Both must resolve to the same entity.
pub async fn get_store(pool: &SqlitePool, id: &str) -> Result<Option<StoreRow>, sqlx::Error> {
    if let Some(row) = get_store_by_uuid(pool, id).await? {
        return Ok(Some(row));
    }
    get_store_by_legacy_id(pool, id).await
}

pub async fn get_store_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<StoreRow>, sqlx::Error> {
    let sql = format!("SELECT {STORE_COLS} FROM stores WHERE slug = ?1");
    sqlx::query_as::<_, StoreRow>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn list_stores(
    pool: &SqlitePool,
    network_id: Option<&str>,
    category_id: Option<&str>,
) -> Result<Vec<StoreRow>, sqlx::Error> {
    match (network_id, category_id) {
        (Some(net), Some(cat)) => {
            let sql = format!(
                "SELECT {STORE_COLS} FROM stores
                 WHERE network_id = ?1 AND category_id = ?2 ORDER BY name"
            );
            sqlx::query_as::<_, StoreRow>(&sql)
                .bind(net)
                .bind(cat)
                .fetch_all(pool)
                .await
        }
        (Some(net), None) => {
            let sql = format!("SELECT {STORE_COLS} FROM stores WHERE network_id = ?1 ORDER BY name");
            sqlx::query_as::<_, StoreRow>(&sql)
                .bind(net)
                .fetch_all(pool)
                .await
        }
        (None, Some(cat)) => {
            let sql =
                format!("SELECT {STORE_COLS} FROM stores WHERE category_id = ?1 ORDER BY name");
            sqlx::query_as::<_, StoreRow>(&sql)
                .bind(cat)
                .fetch_all(pool)
                .await
        }
        (None, None) => {
            let sql = format!("SELECT {STORE_COLS} FROM stores ORDER BY name");
            sqlx::query_as::<_, StoreRow>(&sql).fetch_all(pool).await
        }
    }
}

/// Website URLs of every store, for TLD-based region inference.
pub async fn store_website_urls(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT website_url FROM stores WHERE website_url IS NOT NULL AND website_url != ''",
    )
    .fetch_all(pool)
    .await
}

// ── Admin updates ──────────────────────────────────────────────────────────

/// Failure taxonomy for admin updates, mapped to HTTP statuses by the
/// handlers (404 / 400 / 400 / 500 respectively).
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("record not found")]
    NotFound,
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

// camelCase request keys → native column names. Unknown keys are skipped.
const STORE_UPDATE_COLUMNS: &[(&str, &str)] = &[
    ("name", "name"),
    ("slug", "slug"),
    ("logoUrl", "logo_url"),
    ("cdnLogoUrl", "cdn_logo_url"),
    ("websiteUrl", "website_url"),
    ("trackingUrl", "tracking_url"),
    ("networkId", "network_id"),
    ("categoryId", "category_id"),
    ("rating", "rating"),
    ("reviewCount", "review_count"),
    ("seoTitle", "seo_title"),
    ("seoDescription", "seo_description"),
    ("isActive", "is_active"),
    ("storeId", "\"Store Id\""),
];

const COUPON_UPDATE_COLUMNS: &[(&str, &str)] = &[
    ("code", "code"),
    ("couponType", "coupon_type"),
    ("title", "title"),
    ("description", "description"),
    ("discountValue", "discount_value"),
    ("discountType", "discount_type"),
    ("maxUses", "max_uses"),
    ("currentUses", "current_uses"),
    ("isActive", "is_active"),
    ("expiresAt", "expires_at"),
    ("affiliateUrl", "affiliate_url"),
    ("deepLink", "\"Deep Link\""),
    ("deeplink", "deeplink"),
    ("url", "url"),
    ("priority", "priority"),
    ("categoryId", "category_id"),
    ("storeId", "\"Store Id\""),
    ("storeUuid", "store_uuid"),
    ("storeName", "store_name"),
    ("storeIds", "store_ids"),
];

pub async fn update_store(
    pool: &SqlitePool,
    id: &str,
    updates: &serde_json::Map<String, Value>,
) -> Result<(), UpdateError> {
    let store = get_store(pool, id).await?.ok_or(UpdateError::NotFound)?;
    apply_update(pool, "stores", &store.id, updates, STORE_UPDATE_COLUMNS).await
}

/// Admin coupon save. Enforces the coupon-type invariant: a deal never
/// carries a code, and a code-type coupon must end up with a non-empty one.
pub async fn update_coupon(
    pool: &SqlitePool,
    id: &str,
    updates: &serde_json::Map<String, Value>,
) -> Result<(), UpdateError> {
    let existing = get_coupon_by_id(pool, id)
        .await?
        .ok_or(UpdateError::NotFound)?;

    let mut updates = updates.clone();
    let effective_type = updates
        .get("couponType")
        .and_then(Value::as_str)
        .unwrap_or(&existing.coupon_type)
        .to_owned();

    match effective_type.as_str() {
        "deal" => {
            updates.insert("code".to_owned(), Value::Null);
        }
        "code" => {
            // A present "code" key is authoritative, even when it is null or
            // not a string; only an absent key falls back to the stored code.
            let effective_code = match updates.get("code") {
                Some(value) => value.as_str().unwrap_or_default().to_owned(),
                None => existing.code.clone().unwrap_or_default(),
            };
            if effective_code.trim().is_empty() {
                return Err(UpdateError::Validation(
                    "A code-type coupon requires a non-empty code.".to_owned(),
                ));
            }
        }
        other => {
            return Err(UpdateError::Validation(format!(
                "Unknown coupon type '{other}'; expected 'code' or 'deal'."
            )));
        }
    }

    apply_update(pool, "coupons", &existing.id, &updates, COUPON_UPDATE_COLUMNS).await
}

async fn apply_update(
    pool: &SqlitePool,
    table: &str,
    pk: &str,
    updates: &serde_json::Map<String, Value>,
    columns: &[(&str, &str)],
) -> Result<(), UpdateError> {
    let mut sets = Vec::new();
    let mut values = Vec::new();
    for (key, value) in updates {
        match columns.iter().find(|(k, _)| *k == key.as_str()) {
            Some((_, col)) => {
                sets.push(format!("{col} = ?"));
                values.push(value.clone());
            }
            None => tracing::warn!("ignoring unknown update key '{}' for {}", key, table),
        }
    }

    if sets.is_empty() {
        return Err(UpdateError::Validation(
            "No recognized fields in update.".to_owned(),
        ));
    }

    let sql = format!(
        "UPDATE {table} SET {}, updated_at = datetime('now') WHERE id = ?",
        sets.join(", ")
    );
    let mut query = sqlx::query(&sql);
    for value in &values {
        query = bind_value(query, value);
    }
    query.bind(pk).execute(pool).await.map_err(map_constraint)?;

    Ok(())
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        // Arrays/objects are stored as their JSON text (store_ids et al).
        other => query.bind(other.to_string()),
    }
}

fn map_constraint(e: sqlx::Error) -> UpdateError {
    if let sqlx::Error::Database(ref db) = e {
        let msg = db.message();
        if msg.contains("UNIQUE") {
            // "UNIQUE constraint failed: stores.slug" → "slug"
            let field = msg.rsplit('.').next().unwrap_or("value").trim();
            return UpdateError::Duplicate(format!("That {field} is already taken."));
        }
    }
    UpdateError::Db(e)
}

// ── Content ────────────────────────────────────────────────────────────────

pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, color, logo_url, created_at FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn list_regions(pool: &SqlitePool) -> Result<Vec<Region>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, network_id FROM regions ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn list_banners(pool: &SqlitePool) -> Result<Vec<Banner>, sqlx::Error> {
    // Assigned slots first, in slot order; unslotted banners trail by age.
    sqlx::query_as(
        "SELECT id, title, image_url, link_url, position, is_active, created_at
         FROM banners WHERE is_active = 1
         ORDER BY position IS NULL, position, created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_events(pool: &SqlitePool) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, title, banner_url, description, starts_at, ends_at, position, created_at
         FROM events ORDER BY position IS NULL, position, created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn list_news(pool: &SqlitePool) -> Result<Vec<NewsItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, title, description, image_url, published_at, created_at
         FROM news ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn coupon(legacy_store_id: Option<&str>, store_ids: Option<&str>, name: Option<&str>) -> CouponRow {
        CouponRow {
            id: "c1".into(),
            legacy_id: None,
            store_uuid: None,
            legacy_store_id: legacy_store_id.map(str::to_owned),
            store_ids: store_ids.map(str::to_owned),
            store_name: name.map(str::to_owned),
            code: None,
            coupon_type: "deal".into(),
            title: None,
            description: None,
            discount_value: None,
            discount_type: None,
            max_uses: 0,
            current_uses: 0,
            is_active: true,
            expires_at: None,
            affiliate_url: None,
            deep_link: None,
            deeplink: None,
            url: None,
            priority: 0,
            category_id: None,
            created_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2026, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn keys() -> StoreKeys {
        StoreKeys {
            uuid: Some("3f8e7c5a-1b2d-4e6f-9a0b-123456789abc".into()),
            legacy_id: Some("42".into()),
            name: Some("Acme Supplies".into()),
        }
    }

    #[test]
    fn matches_on_legacy_numeric_id() {
        assert!(coupon_matches_store(&coupon(Some("42"), None, None), &keys()));
        assert!(!coupon_matches_store(&coupon(Some("43"), None, None), &keys()));
    }

    #[test]
    fn matches_uuid_inside_store_ids_array() {
        let row = coupon(
            None,
            Some(r#"["other", "3f8e7c5a-1b2d-4e6f-9a0b-123456789abc"]"#),
            None,
        );
        assert!(coupon_matches_store(&row, &keys()));
    }

    #[test]
    fn matches_numeric_entry_inside_store_ids_array() {
        // Spreadsheet exports sometimes hold bare numbers, not strings.
        let row = coupon(None, Some("[7, 42]"), None);
        assert!(coupon_matches_store(&row, &keys()));
    }

    #[test]
    fn matches_store_name_case_insensitively() {
        let row = coupon(None, None, Some("ACME SUPPLIES"));
        assert!(coupon_matches_store(&row, &keys()));
    }

    #[test]
    fn garbage_store_ids_json_is_ignored() {
        let row = coupon(None, Some("not json"), None);
        assert!(!coupon_matches_store(&row, &keys()));
    }

    #[test]
    fn no_keys_no_match() {
        let row = coupon(Some("42"), None, None);
        assert!(!coupon_matches_store(&row, &StoreKeys::default()));
    }

    #[test]
    fn uuid_shape_detection() {
        assert!(is_uuid("3f8e7c5a-1b2d-4e6f-9a0b-123456789abc"));
        assert!(!is_uuid("42"));
        assert!(!is_uuid(""));
    }
}
