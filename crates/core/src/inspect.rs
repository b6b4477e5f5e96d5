use std::cmp::Ordering;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::{ListingCache, ListingKey, DEFAULT_CACHE_CAPACITY};
use crate::config::InspectorConfig;
use crate::error::InspectError;
use crate::model::{
    DirEntry, DirectoryListing, EntrySkip, FileEntry, SizeBackendKind, SkipReason, SortMode,
};
use crate::size::{backend_for, SizeBackend};

/// Outcome of inspecting one child of a listed directory.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    File(FileEntry),
    /// A subdirectory plus whatever its size walk could not read.
    Directory {
        entry: DirEntry,
        skipped: Vec<EntrySkip>,
    },
    Skipped(EntrySkip),
    /// Sockets, fifos and other node types that are neither files nor
    /// directories.
    Ignored,
}

/// Lists directories one level deep, with subdirectory sizes aggregated
/// through a [`SizeBackend`], and memoizes results per `(path, sort)`.
pub struct DirectoryInspector {
    cache: ListingCache,
    size_backend: Box<dyn SizeBackend>,
}

impl DirectoryInspector {
    pub fn new(capacity: NonZeroUsize, backend: SizeBackendKind) -> Self {
        Self {
            cache: ListingCache::new(capacity),
            size_backend: backend_for(&backend),
        }
    }

    pub fn from_config(config: &InspectorConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self::new(capacity, config.size_backend.clone())
    }

    pub fn size_backend(&self) -> SizeBackendKind {
        self.size_backend.kind()
    }

    /// Returns the listing for `path` sorted by `sort`, from cache when an
    /// entry for the exact key exists. Cached listings may predate later
    /// filesystem changes.
    pub fn list_directory(
        &self,
        path: &Path,
        sort: SortMode,
    ) -> Result<Arc<DirectoryListing>, InspectError> {
        let key = ListingKey::new(path, sort);
        if let Some(hit) = self.cache.get(&key)? {
            debug!("listing cache hit for {} ({})", path.display(), sort.as_str());
            return Ok(hit);
        }

        let listing = Arc::new(read_listing(path, sort, self.size_backend.as_ref())?);
        self.cache.insert(key, Arc::clone(&listing))?;
        Ok(listing)
    }

    pub fn cached_keys(&self) -> Result<Vec<ListingKey>, InspectError> {
        self.cache.keys()
    }

    pub fn clear_cache(&self) -> Result<(), InspectError> {
        self.cache.clear()
    }
}

impl Default for DirectoryInspector {
    fn default() -> Self {
        Self::from_config(&InspectorConfig::default())
    }
}

/// Builds a fresh, uncached listing of the immediate children of `path`.
pub fn read_listing(
    path: &Path,
    sort: SortMode,
    size_backend: &dyn SizeBackend,
) -> Result<DirectoryListing, InspectError> {
    match path.try_exists() {
        Ok(true) => {}
        Ok(false) => return Err(InspectError::NotFound(path.to_path_buf())),
        Err(source) => {
            return Err(InspectError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let children = fs::read_dir(path).map_err(|source| {
        warn!("failed to read directory {}: {}", path.display(), source);
        InspectError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut listing = DirectoryListing::empty(path.to_string_lossy(), sort);
    for child in children {
        let outcome = match child {
            Ok(child) => inspect_entry(&child.path(), size_backend),
            Err(err) => Ok(EntryOutcome::Skipped(EntrySkip {
                path: path.to_string_lossy().to_string(),
                reason: SkipReason::from_io(&err),
            })),
        };

        match outcome {
            Ok(EntryOutcome::File(file)) => listing.files.push(file),
            Ok(EntryOutcome::Directory { entry, skipped }) => {
                listing.directories.push(entry);
                listing.skipped.extend(skipped);
            }
            Ok(EntryOutcome::Skipped(skip)) | Err(skip) => {
                debug!("listing skipped {}: {:?}", skip.path, skip.reason);
                listing.skipped.push(skip);
            }
            Ok(EntryOutcome::Ignored) => {}
        }
    }

    sort_listing(&mut listing);
    Ok(listing)
}

/// Classifies one child. Symlinks are resolved to their target; a dangling
/// link surfaces as a skip.
pub fn inspect_entry(
    path: &Path,
    size_backend: &dyn SizeBackend,
) -> Result<EntryOutcome, EntrySkip> {
    let metadata = fs::metadata(path).map_err(|err| EntrySkip {
        path: path.to_string_lossy().to_string(),
        reason: SkipReason::from_io(&err),
    })?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let accessed = metadata.accessed().ok().map(DateTime::<Utc>::from);

    if metadata.is_file() {
        return Ok(EntryOutcome::File(FileEntry {
            name,
            path: path.to_string_lossy().to_string(),
            size_bytes: metadata.len(),
            accessed,
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }));
    }

    if metadata.is_dir() {
        let size = size_backend.measure(path);
        return Ok(EntryOutcome::Directory {
            entry: DirEntry {
                name,
                path: path.to_string_lossy().to_string(),
                size_bytes: size.total_bytes,
                accessed,
            },
            skipped: size.skipped,
        });
    }

    Ok(EntryOutcome::Ignored)
}

/// Sorts files and directories independently according to `listing.sort`.
/// Ties break on path so that recent-first is the exact reverse of
/// least-recent-first.
pub fn sort_listing(listing: &mut DirectoryListing) {
    sort_entries(&mut listing.files, listing.sort);
    sort_entries(&mut listing.directories, listing.sort);
}

trait Ranked {
    fn size_bytes(&self) -> u64;
    fn accessed(&self) -> Option<DateTime<Utc>>;
    fn path(&self) -> &str;
}

impl Ranked for FileEntry {
    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    fn accessed(&self) -> Option<DateTime<Utc>> {
        self.accessed
    }

    fn path(&self) -> &str {
        &self.path
    }
}

impl Ranked for DirEntry {
    fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    fn accessed(&self) -> Option<DateTime<Utc>> {
        self.accessed
    }

    fn path(&self) -> &str {
        &self.path
    }
}

fn sort_entries<T: Ranked>(entries: &mut [T], sort: SortMode) {
    match sort {
        SortMode::BySize => entries.sort_by(|a, b| {
            b.size_bytes()
                .cmp(&a.size_bytes())
                .then_with(|| a.path().cmp(b.path()))
        }),
        SortMode::ByLeastRecentAccess => entries.sort_by(|a, b| least_recent_first(a, b)),
        SortMode::ByRecentAccess => entries.sort_by(|a, b| least_recent_first(b, a)),
    }
}

// Entries without an access time sort as the least recent.
fn least_recent_first<T: Ranked>(a: &T, b: &T) -> Ordering {
    a.accessed()
        .cmp(&b.accessed())
        .then_with(|| a.path().cmp(b.path()))
}
