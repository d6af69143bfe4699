//! Raw-row → API-shape conversion.
//!
//! The coupons and stores tables mix spreadsheet-import columns with
//! snake_case ones, so every outbound record passes through exactly one
//! mapping function here. Everything in this module is a pure function; the
//! raw shapes stay confined to the database layer.

use crate::expiry;
use crate::models::{Coupon, CouponRow, Store, StoreRow};

// ── Text cleanup ───────────────────────────────────────────────────────────

/// Entities that actually occur in the imported data. Deliberately a fixed
/// table, not a general HTML decoder.
const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&pound;", "£"),
    ("&euro;", "€"),
    ("&copy;", "©"),
    ("&trade;", "™"),
];

pub fn decode_entities(s: &str) -> String {
    let mut out = s.to_owned();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out
}

/// Trim and entity-decode a free-text field; blank becomes `None`.
pub fn clean_text(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    Some(decode_entities(s))
}

/// Values the import used where it really meant "nothing".
fn is_placeholder(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "" | "-" | "n/a" | "na" | "none" | "null"
    )
}

// ── URL resolution ─────────────────────────────────────────────────────────

/// Prefix a scheme when a value looks like a bare domain. Anything that
/// already carries a scheme, or that does not look like a domain at all,
/// passes through unchanged.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_owned();
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if raw.contains('.') && !raw.contains(char::is_whitespace) && !raw.contains("://") {
        return format!("https://{raw}");
    }
    raw.to_owned()
}

/// URL priority chain: structured affiliate URL, then the two legacy
/// deep-link columns, then the generic catch-all. First non-blank wins.
pub fn resolve_url(row: &CouponRow) -> Option<String> {
    [
        row.affiliate_url.as_deref(),
        row.deep_link.as_deref(),
        row.deeplink.as_deref(),
        row.url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|s| !s.is_empty())
    .map(normalize_url)
}

// ── Title resolution ───────────────────────────────────────────────────────

/// Synthesize a display title from the discount fields, e.g. "20% Off" or
/// "$15 Off".
fn discount_title(value: Option<f64>, discount_type: Option<&str>) -> Option<String> {
    let value = value.filter(|v| *v > 0.0)?;
    // Render 20.0 as "20", 12.5 as "12.5".
    let rendered = if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    };
    match discount_type {
        Some("percentage") => Some(format!("{rendered}% Off")),
        Some("fixed") => Some(format!("${rendered} Off")),
        _ => None,
    }
}

/// Display-title priority: explicit title → description (unless it is an
/// import placeholder) → synthesized discount string → store name →
/// generic fallback.
pub fn resolve_title(row: &CouponRow, store_name: &str) -> String {
    if let Some(title) = clean_text(row.title.as_deref()) {
        return title;
    }
    if let Some(desc) = clean_text(row.description.as_deref()) {
        if !is_placeholder(&desc) {
            return desc;
        }
    }
    if let Some(synth) = discount_title(row.discount_value, row.discount_type.as_deref()) {
        return synth;
    }
    if !store_name.is_empty() {
        return format!("{store_name} Offer");
    }
    "Special Offer".to_owned()
}

// ── Store helpers ──────────────────────────────────────────────────────────

/// Logo fallback chain: explicit URL, then the CDN copy.
pub fn store_logo(row: &StoreRow) -> Option<String> {
    [row.logo_url.as_deref(), row.cdn_logo_url.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(normalize_url)
}

/// Infer a region label from a website URL's domain TLD. Generic TLDs map
/// to nothing; only country TLDs that occur in the store data are listed.
pub fn region_from_tld(url: &str) -> Option<&'static str> {
    let host = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    let host = host.split(['/', '?', '#']).next().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();

    const TLDS: &[(&str, &str)] = &[
        (".co.uk", "United Kingdom"),
        (".org.uk", "United Kingdom"),
        (".uk", "United Kingdom"),
        (".com.au", "Australia"),
        (".au", "Australia"),
        (".de", "Germany"),
        (".fr", "France"),
        (".es", "Spain"),
        (".it", "Italy"),
        (".nl", "Netherlands"),
        (".ca", "Canada"),
        (".in", "India"),
        (".us", "United States"),
    ];
    TLDS.iter()
        .find(|(suffix, _)| host.ends_with(suffix))
        .map(|(_, region)| *region)
}

// ── Row conversion ─────────────────────────────────────────────────────────

/// The store reference a coupon row carries, preferring the UUID column.
pub fn coupon_store_ref(row: &CouponRow) -> Option<String> {
    row.store_uuid
        .as_deref()
        .or(row.legacy_store_id.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Map one raw coupon row into the normalized API shape.
///
/// `store_name` is the authoritative name resolved from the stores table;
/// the denormalized name on the row is never trusted for output, and an
/// unresolvable reference degrades to an empty name rather than dropping
/// the coupon.
pub fn coupon_to_api(row: &CouponRow, store_name: Option<&str>) -> Coupon {
    let store_name = store_name.unwrap_or("").to_owned();
    // Deal-type coupons never expose a code, whatever the row holds.
    let code = if row.coupon_type == "deal" {
        None
    } else {
        clean_text(row.code.as_deref())
    };

    Coupon {
        id: row.id.clone(),
        store_id: coupon_store_ref(row),
        title: resolve_title(row, &store_name),
        store_name,
        code,
        coupon_type: row.coupon_type.clone(),
        description: clean_text(row.description.as_deref()),
        discount_value: row.discount_value,
        discount_type: row.discount_type.clone(),
        max_uses: row.max_uses,
        current_uses: row.current_uses,
        is_active: row.is_active,
        expires_at: expiry::normalize_expiry(row.expires_at.as_deref()),
        url: resolve_url(row),
        priority: row.priority,
        category_id: row.category_id.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// Map one raw store row into the normalized API shape.
pub fn store_to_api(row: &StoreRow) -> Store {
    Store {
        id: row.id.clone(),
        store_id: row.legacy_id.clone(),
        name: decode_entities(&row.name),
        slug: row.slug.clone(),
        logo_url: store_logo(row),
        website_url: clean_text(row.website_url.as_deref()),
        tracking_url: clean_text(row.tracking_url.as_deref()),
        network_id: row.network_id.clone(),
        category_id: row.category_id.clone(),
        rating: row.rating,
        review_count: row.review_count,
        seo_title: clean_text(row.seo_title.as_deref()),
        seo_description: clean_text(row.seo_description.as_deref()),
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row() -> CouponRow {
        CouponRow {
            id: "c1".into(),
            legacy_id: None,
            store_uuid: None,
            legacy_store_id: Some("42".into()),
            store_ids: None,
            store_name: Some("Stale Name".into()),
            code: Some("SAVE20".into()),
            coupon_type: "code".into(),
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

    #[test]
    fn entity_decoding() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&pound;5 off"), "£5 off");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn url_chain_prefers_affiliate_url() {
        let mut r = row();
        r.affiliate_url = Some("https://a.example/offer".into());
        r.deep_link = Some("https://legacy.example/deep".into());
        r.url = Some("https://generic.example".into());
        assert_eq!(resolve_url(&r).as_deref(), Some("https://a.example/offer"));
    }

    #[test]
    fn url_chain_falls_through_blanks() {
        let mut r = row();
        r.affiliate_url = Some("   ".into());
        r.deep_link = None;
        r.deeplink = Some("https://legacy.example/dl".into());
        assert_eq!(resolve_url(&r).as_deref(), Some("https://legacy.example/dl"));
    }

    #[test]
    fn bare_domain_gets_a_scheme() {
        let mut r = row();
        r.url = Some("shop.example.com/sale".into());
        assert_eq!(
            resolve_url(&r).as_deref(),
            Some("https://shop.example.com/sale")
        );
        assert_eq!(normalize_url("//cdn.example.com/x"), "https://cdn.example.com/x");
        // Not domain-shaped: left alone.
        assert_eq!(normalize_url("see store for details"), "see store for details");
    }

    #[test]
    fn title_priority_chain() {
        let mut r = row();
        r.title = Some("Big &amp; Bold Sale".into());
        assert_eq!(resolve_title(&r, "Acme"), "Big & Bold Sale");

        r.title = None;
        r.description = Some("Save big this week".into());
        assert_eq!(resolve_title(&r, "Acme"), "Save big this week");

        r.description = Some("n/a".into());
        r.discount_value = Some(20.0);
        r.discount_type = Some("percentage".into());
        assert_eq!(resolve_title(&r, "Acme"), "20% Off");

        r.discount_type = Some("fixed".into());
        r.discount_value = Some(15.0);
        assert_eq!(resolve_title(&r, "Acme"), "$15 Off");

        r.discount_value = None;
        assert_eq!(resolve_title(&r, "Acme"), "Acme Offer");
        assert_eq!(resolve_title(&r, ""), "Special Offer");
    }

    #[test]
    fn deal_type_clears_code() {
        let mut r = row();
        r.coupon_type = "deal".into();
        let api = coupon_to_api(&r, Some("Acme"));
        assert_eq!(api.code, None);

        let api = coupon_to_api(&row(), Some("Acme"));
        assert_eq!(api.code.as_deref(), Some("SAVE20"));
    }

    #[test]
    fn store_name_degrades_to_empty() {
        let api = coupon_to_api(&row(), None);
        assert_eq!(api.store_name, "");
    }

    #[test]
    fn tld_inference() {
        assert_eq!(region_from_tld("https://www.shop.co.uk/x"), Some("United Kingdom"));
        assert_eq!(region_from_tld("shop.de"), Some("Germany"));
        assert_eq!(region_from_tld("https://shop.com.au:8080/p"), Some("Australia"));
        assert_eq!(region_from_tld("https://shop.example.com"), None);
    }
}
