use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thread-safe in-memory TTL cache mapping a composite query key to a
/// previously computed result set.
///
/// Backed by a DashMap so reads are concurrent and lock-free for most cases.
/// Each resource type (coupons, stores) gets its own instance with its own
/// TTL. Entries are never evicted; a stale entry simply stops being returned
/// and is overwritten by the next live query. Admin writes call `clear()` as
/// a best-effort freshness hook — the TTL is the real staleness bound.
#[derive(Clone, Debug)]
pub struct TtlCache<T> {
    inner: Arc<DashMap<String, Entry<T>>>,
    ttl: Duration,
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Look up a key, returning a clone of the value if the entry is still
    /// within its TTL.
    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, Instant::now())
    }

    /// Freshness check against an explicit instant. This is the seam tests
    /// use instead of sleeping through a real TTL window.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<T> {
        let entry = self.inner.get(key)?;
        if now.duration_since(entry.stored_at) < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Insert or overwrite an entry, stamped with the current instant.
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.inner.insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry. Called from the admin write handlers so the public
    /// read path picks up edits without waiting out the TTL.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Number of entries currently cached (fresh or stale).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Escape a filter value for use in a `|`-joined cache key. Without this a
/// value containing the separator could collide with a different filter set.
pub fn key_part(value: Option<&str>) -> String {
    let raw = value.unwrap_or("");
    if !raw.contains(['|', '\\']) {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len() + 2);
    for ch in raw.chars() {
        if matches!(ch, '|' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let cache: TtlCache<Vec<u32>> = TtlCache::new(Duration::from_secs(30));
        cache.set("store=42", vec![1, 2, 3]);
        assert_eq!(cache.get("store=42"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn miss_after_ttl() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(30));
        cache.set("k", 7);
        let later = Instant::now() + Duration::from_secs(31);
        assert_eq!(cache.get_at("k", later), None);
    }

    #[test]
    fn different_key_misses() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(30));
        cache.set("store=42", 1);
        assert_eq!(cache.get("store=43"), None);
    }

    #[test]
    fn clear_drops_everything() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(30));
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn separator_in_value_cannot_forge_another_key() {
        let forged = format!(
            "id={}|active={}",
            key_part(Some("c1|active=true")),
            key_part(None)
        );
        let honest = format!("id={}|active={}", key_part(Some("c1")), key_part(Some("true")));
        assert_ne!(forged, honest);
        assert_eq!(key_part(Some("plain")), "plain");
    }

    #[test]
    fn set_overwrites_and_refreshes() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(30));
        cache.set("k", 1);
        cache.set("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
