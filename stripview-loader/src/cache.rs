use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lru::LruCache;

/// Names one pixel-budgeted cache inside the queue's cache store.
///
/// Typical photo strips keep a small-thumbnail category and a full-size category so that
/// scrolling through thumbnails never evicts the full-size image on screen.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CacheCategory {
    /// The cache used for requests that do not name a category.
    #[default]
    Default,
    Named(Arc<str>),
}

impl CacheCategory {
    pub fn named(name: &str) -> Self {
        Self::Named(Arc::from(name))
    }
}

impl From<&str> for CacheCategory {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for CacheCategory {
    fn from(name: String) -> Self {
        Self::Named(Arc::from(name))
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("<default>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A point-in-time view of one category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    pub entries: usize,
    pub pixels: u64,
    pub budget: u64,
    /// Entries dropped to make room since the category was created.
    pub evictions: u64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    image: Arc<V>,
    pixels: u64,
}

/// Photo-index keyed entries whose pixel total never exceeds the budget.
///
/// Eviction is oldest-inserted first; lookups use `peek` and never refresh an entry.
#[derive(Debug)]
pub(crate) struct CategoryCache<V> {
    budget: u64,
    used: u64,
    evictions: u64,
    entries: LruCache<usize, CacheEntry<V>>,
}

impl<V> CategoryCache<V> {
    pub(crate) fn new(budget: u64) -> Self {
        Self {
            budget,
            used: 0,
            evictions: 0,
            entries: LruCache::unbounded(),
        }
    }

    pub(crate) fn get(&self, photo_index: usize) -> Option<Arc<V>> {
        self.entries
            .peek(&photo_index)
            .map(|e| Arc::clone(&e.image))
    }

    pub(crate) fn contains(&self, photo_index: usize) -> bool {
        self.entries.contains(&photo_index)
    }

    /// Inserts `image`, evicting the oldest entries until it fits.
    ///
    /// An image larger than the whole budget is not stored and evicts nothing; returns
    /// whether the image was stored.
    pub(crate) fn insert(&mut self, photo_index: usize, image: Arc<V>, pixels: u64) -> bool {
        if pixels > self.budget {
            return false;
        }
        if let Some(old) = self.entries.pop(&photo_index) {
            self.used -= old.pixels;
        }

        self.evict_until(self.budget - pixels);

        self.entries.push(photo_index, CacheEntry { image, pixels });
        self.used += pixels;
        true
    }

    /// Changes the budget, evicting oldest entries if the new one is smaller.
    pub(crate) fn set_budget(&mut self, budget: u64) {
        self.budget = budget;
        self.evict_until(budget);
    }

    /// Drops oldest entries until at most `limit` pixels are in use.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn evict_until(&mut self, limit: u64) {
        while self.used > limit {
            let Some((index, old)) = self.entries.pop_lru() else {
                break;
            };
            self.used -= old.pixels;
            self.evictions += 1;
            vtrace!(photo_index = index, pixels = old.pixels, "cache: evicted");
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            pixels: self.used,
            budget: self.budget,
            evictions: self.evictions,
        }
    }
}

/// Every category's cache. Owned by the queue and only touched under its lock.
#[derive(Debug)]
pub(crate) struct CacheStore<V> {
    default_budget: u64,
    categories: HashMap<CacheCategory, CategoryCache<V>>,
}

impl<V> CacheStore<V> {
    pub(crate) fn new(default_budget: u64) -> Self {
        let mut categories = HashMap::new();
        categories.insert(CacheCategory::Default, CategoryCache::new(default_budget));
        Self {
            default_budget,
            categories,
        }
    }

    pub(crate) fn is_registered(&self, category: &CacheCategory) -> bool {
        self.categories.contains_key(category)
    }

    /// Creates the category, or changes its budget if it already exists.
    pub(crate) fn register(&mut self, category: CacheCategory, budget: u64) {
        match self.categories.get_mut(&category) {
            Some(cache) => cache.set_budget(budget),
            None => {
                self.categories.insert(category, CategoryCache::new(budget));
            }
        }
    }

    /// The category's cache, created with the default budget if it is unknown.
    pub(crate) fn ensure(&mut self, category: &CacheCategory) -> &mut CategoryCache<V> {
        let budget = self.default_budget;
        self.categories
            .entry(category.clone())
            .or_insert_with(|| CategoryCache::new(budget))
    }

    pub(crate) fn get(&self, category: &CacheCategory) -> Option<&CategoryCache<V>> {
        self.categories.get(category)
    }

    pub(crate) fn lookup(&self, category: &CacheCategory, photo_index: usize) -> Option<Arc<V>> {
        self.categories.get(category)?.get(photo_index)
    }

    pub(crate) fn reset(&mut self, category: &CacheCategory) {
        if let Some(cache) = self.categories.get_mut(category) {
            cache.clear();
        }
    }

    pub(crate) fn clear_all(&mut self) {
        for cache in self.categories.values_mut() {
            cache.clear();
        }
    }
}
