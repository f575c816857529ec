//! Rendered-page cache for the public site.
//!
//! Entries are keyed by request path and query. Admin mutations call
//! [`PageCache::revalidate`] with locale-free paths so every language and
//! query variant of those pages is rebuilt on the next request.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::i18n::strip_locale;

struct CachedPage {
    html: String,
    stored_at: Instant,
}

pub struct PageCache {
    entries: Mutex<LruCache<String, CachedPage>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        let fresh = entries
            .get(key)
            .map(|page| page.stored_at.elapsed() < self.ttl)?;
        if fresh {
            entries.get(key).map(|page| page.html.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    pub fn insert(&self, key: String, html: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                CachedPage {
                    html,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    /// Drops every cached variant of the given locale-free paths.
    /// Returns the number of entries removed.
    pub fn revalidate(&self, paths: &[String]) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let stale: Vec<String> = entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| {
                let path = key.split('?').next().unwrap_or("");
                let path = strip_locale(path);
                paths.iter().any(|p| p == path)
            })
            .cloned()
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        tracing::debug!("Page cache revalidated: paths={:?}, removed={}", paths, stale.len());
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Public pages that show the given car, or every listing page when `None`.
pub fn car_paths(car_id: Option<uuid::Uuid>) -> Vec<String> {
    let mut paths = vec!["/".to_string(), "/cars".to_string()];
    if let Some(id) = car_id {
        paths.push(format!("/cars/{}", id));
    }
    paths
}
