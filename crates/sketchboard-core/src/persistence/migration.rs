//! One-time migration of the legacy cookie-based autosave.
//!
//! Older builds split the percent-encoded board JSON across cookies named
//! `sb_autosave_0`, `sb_autosave_1`, ... with the chunk count in
//! `sb_autosave_count`. On first load the chunks are joined, decoded and moved
//! into the local store, then every legacy cookie is expired.

use crate::storage::Storage;
use std::collections::BTreeMap;

/// Prefix shared by all legacy autosave cookies.
pub const LEGACY_COOKIE_PREFIX: &str = "sb_autosave_";

/// How many numbered chunk cookies are expired during cleanup.
pub const LEGACY_MAX_CHUNKS: usize = 200;

/// Read and expire cookies by name. Values are returned as stored (still percent-encoded).
pub trait CookieJar {
    fn get(&self, name: &str) -> Option<String>;
    fn remove(&mut self, name: &str);
}

/// An in-memory cookie jar, parsed from a `Cookie` header or `document.cookie`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieMap {
    cookies: BTreeMap<String, String>,
}

impl CookieMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `name=value; name2=value2`. Values are kept verbatim.
    pub fn parse(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { cookies }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CookieJar for CookieMap {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn remove(&mut self, name: &str) {
        self.cookies.remove(name);
    }
}

/// The page's real cookies on WASM.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentCookies;

#[cfg(target_arch = "wasm32")]
impl DocumentCookies {
    fn document() -> Option<web_sys::HtmlDocument> {
        use wasm_bindgen::JsCast;
        web_sys::window()?
            .document()?
            .dyn_into::<web_sys::HtmlDocument>()
            .ok()
    }
}

#[cfg(target_arch = "wasm32")]
impl CookieJar for DocumentCookies {
    fn get(&self, name: &str) -> Option<String> {
        let header = Self::document()?.cookie().ok()?;
        CookieMap::parse(&header).get(name)
    }

    fn remove(&mut self, name: &str) {
        if let Some(document) = Self::document() {
            let expired = format!("{}=; path=/; max-age=0; samesite=lax", name);
            if let Err(e) = document.set_cookie(&expired) {
                log::warn!("Could not expire cookie {}: {:?}", name, e);
            }
        }
    }
}

/// Result of a migration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy autosave cookies were present.
    NothingToMigrate,
    /// The legacy payload was written to the local store.
    Migrated { bytes: usize },
    /// Legacy cookies were present but unusable. They were expired anyway.
    Discarded,
}

/// Move a legacy cookie autosave into `storage` under `key`.
///
/// Running it again after a successful migration finds no cookies and does
/// nothing, so it is safe to call on every load.
pub async fn migrate_legacy_autosave<S: Storage + ?Sized>(
    cookies: &mut dyn CookieJar,
    storage: &S,
    key: &str,
) -> MigrationOutcome {
    let count_name = format!("{}count", LEGACY_COOKIE_PREFIX);
    let Some(raw_count) = cookies.get(&count_name) else {
        return MigrationOutcome::NothingToMigrate;
    };
    let count = urlencoding::decode(&raw_count)
        .ok()
        .and_then(|c| c.trim().parse::<usize>().ok());
    let count = match count {
        Some(0) => return MigrationOutcome::NothingToMigrate,
        Some(n) if n <= LEGACY_MAX_CHUNKS => n,
        _ => {
            log::warn!("Discarding legacy autosave with chunk count {:?}", raw_count);
            clear_legacy_cookies(cookies);
            return MigrationOutcome::Discarded;
        }
    };

    let encoded: String = (0..count)
        .filter_map(|i| cookies.get(&format!("{}{}", LEGACY_COOKIE_PREFIX, i)))
        .collect();

    let outcome = if encoded.is_empty() {
        MigrationOutcome::Discarded
    } else {
        match urlencoding::decode(&encoded) {
            Ok(json) => match storage.save(key, &json).await {
                Ok(()) => {
                    log::info!("Migrated legacy cookie autosave ({} bytes)", json.len());
                    MigrationOutcome::Migrated { bytes: json.len() }
                }
                Err(e) => {
                    log::warn!("Could not store migrated autosave: {}", e);
                    MigrationOutcome::Discarded
                }
            },
            Err(e) => {
                log::warn!("Legacy autosave cookies are not valid UTF-8: {}", e);
                MigrationOutcome::Discarded
            }
        }
    };

    clear_legacy_cookies(cookies);
    outcome
}

/// Expire the count, timestamp and every numbered chunk cookie.
pub fn clear_legacy_cookies(cookies: &mut dyn CookieJar) {
    cookies.remove(&format!("{}count", LEGACY_COOKIE_PREFIX));
    cookies.remove(&format!("{}ts", LEGACY_COOKIE_PREFIX));
    for i in 0..LEGACY_MAX_CHUNKS {
        cookies.remove(&format!("{}{}", LEGACY_COOKIE_PREFIX, i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::storage::test_util::block_on;

    fn legacy_jar(json: &str, chunk: usize) -> CookieMap {
        let encoded = urlencoding::encode(json).into_owned();
        let chunks: Vec<&str> = encoded
            .as_bytes()
            .chunks(chunk)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect();
        let mut jar = CookieMap::new();
        jar.insert("sb_autosave_count", chunks.len().to_string());
        jar.insert("sb_autosave_ts", "1700000000");
        for (i, c) in chunks.iter().enumerate() {
            jar.insert(format!("sb_autosave_{}", i), *c);
        }
        jar.insert("session", "abc");
        jar
    }

    #[test]
    fn test_parse_cookie_header() {
        let jar = CookieMap::parse("a=1; sb_autosave_count=3;  b = x%20y ; junk");
        assert_eq!(jar.get("a").as_deref(), Some("1"));
        assert_eq!(jar.get("sb_autosave_count").as_deref(), Some("3"));
        assert_eq!(jar.get("b").as_deref(), Some("x%20y"));
        assert_eq!(jar.len(), 3);
    }

    #[test]
    fn test_migrates_chunked_payload() {
        let json = r##"{"paths":[{"id":"path-1","points":[{"x":1,"y":2}],"color":"#111827","width":3}],"view":{}}"##;
        let mut jar = legacy_jar(json, 16);
        let storage = MemoryStorage::new();

        let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "sb_autosave_v1"));
        assert_eq!(outcome, MigrationOutcome::Migrated { bytes: json.len() });
        assert_eq!(block_on(storage.load("sb_autosave_v1")).unwrap(), json);

        assert!(jar.get("sb_autosave_count").is_none());
        assert!(jar.get("sb_autosave_ts").is_none());
        assert!(jar.get("sb_autosave_0").is_none());
        assert_eq!(jar.get("session").as_deref(), Some("abc"));
    }

    #[test]
    fn test_migration_is_idempotent() {
        let json = r#"{"paths":[],"view":{}}"#;
        let mut jar = legacy_jar(json, 8);
        let storage = MemoryStorage::new();

        block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
        block_on(storage.save("k", "{\"paths\":[],\"view\":{\"later\":true}}")).unwrap();

        let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
        assert_eq!(outcome, MigrationOutcome::NothingToMigrate);
        assert_eq!(
            block_on(storage.load("k")).unwrap(),
            "{\"paths\":[],\"view\":{\"later\":true}}"
        );
    }

    #[test]
    fn test_zero_count_is_left_alone() {
        let mut jar = CookieMap::new();
        jar.insert("sb_autosave_count", "0");
        let storage = MemoryStorage::new();

        let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
        assert_eq!(outcome, MigrationOutcome::NothingToMigrate);
        assert!(jar.get("sb_autosave_count").is_some());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_oversized_count_is_discarded() {
        let mut jar = legacy_jar(r#"{"paths":[],"view":{}}"#, 8);
        jar.insert("sb_autosave_count", "18446744073709551615");
        let storage = MemoryStorage::new();

        let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
        assert_eq!(outcome, MigrationOutcome::Discarded);
        assert!(jar.get("sb_autosave_count").is_none());
        assert!(jar.get("sb_autosave_0").is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_count_just_over_limit_is_discarded() {
        let mut jar = CookieMap::new();
        jar.insert("sb_autosave_count", (LEGACY_MAX_CHUNKS + 1).to_string());
        let storage = MemoryStorage::new();

        let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
        assert_eq!(outcome, MigrationOutcome::Discarded);
        assert!(jar.is_empty());
    }

    #[test]
    fn test_non_numeric_count_is_discarded() {
        for raw in ["abc", "-3", "%ZZ", ""] {
            let mut jar = CookieMap::new();
            jar.insert("sb_autosave_count", raw);
            jar.insert("sb_autosave_0", "%7B%7D");
            let storage = MemoryStorage::new();

            let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
            assert_eq!(outcome, MigrationOutcome::Discarded, "count {:?}", raw);
            assert!(jar.is_empty());
            assert!(storage.is_empty());
        }
    }

    #[test]
    fn test_missing_chunks_are_cleared() {
        let mut jar = CookieMap::new();
        jar.insert("sb_autosave_count", "2");
        let storage = MemoryStorage::new();

        let outcome = block_on(migrate_legacy_autosave(&mut jar, &storage, "k"));
        assert_eq!(outcome, MigrationOutcome::Discarded);
        assert!(jar.is_empty());
        assert!(storage.is_empty());
    }
}
