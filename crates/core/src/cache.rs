use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;
use tracing::debug;

use crate::error::InspectError;
use crate::model::{DirectoryListing, SortMode};

pub const DEFAULT_CACHE_CAPACITY: usize = 10;

type Entries = LruCache<ListingKey, Arc<DirectoryListing>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub path: PathBuf,
    pub sort: SortMode,
}

impl ListingKey {
    pub fn new(path: impl Into<PathBuf>, sort: SortMode) -> Self {
        Self {
            path: path.into(),
            sort,
        }
    }
}

/// Bounded least-recently-used store of directory listings.
///
/// Lookup, insert and eviction all happen under one lock. Entries never expire
/// and are not invalidated when the filesystem changes.
pub struct ListingCache {
    entries: Mutex<Entries>,
}

impl ListingCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &ListingKey) -> Result<Option<Arc<DirectoryListing>>, InspectError> {
        let mut entries = self.lock()?;
        Ok(entries.get(key).cloned())
    }

    pub fn insert(
        &self,
        key: ListingKey,
        listing: Arc<DirectoryListing>,
    ) -> Result<(), InspectError> {
        let mut entries = self.lock()?;
        if let Some((evicted, _)) = entries.push(key.clone(), listing) {
            if evicted != key {
                debug!(
                    "listing cache evicted {} ({})",
                    evicted.path.display(),
                    evicted.sort.as_str()
                );
            }
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize, InspectError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, InspectError> {
        Ok(self.lock()?.is_empty())
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Result<Vec<ListingKey>, InspectError> {
        Ok(self.lock()?.iter().map(|(key, _)| key.clone()).collect())
    }

    pub fn clear(&self) -> Result<(), InspectError> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, InspectError> {
        self.entries.lock().map_err(|_| InspectError::CacheLock)
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
