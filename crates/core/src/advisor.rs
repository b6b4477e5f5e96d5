use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_SUGGESTION_LIMIT;
use crate::drives::DriveSource;
use crate::error::InspectError;
use crate::inspect::DirectoryInspector;
use crate::model::{DriveInfo, FileEntry, SortMode};

/// Suggests least-recently-accessed files under a path when the drive holding
/// it is nearly full.
pub struct RemovalAdvisor {
    drives: Arc<dyn DriveSource>,
    inspector: Arc<DirectoryInspector>,
    limit: usize,
}

impl RemovalAdvisor {
    pub fn new(drives: Arc<dyn DriveSource>, inspector: Arc<DirectoryInspector>) -> Self {
        Self {
            drives,
            inspector,
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// For every drive at or above `threshold_percent` whose mount point
    /// contains `path`, appends the first `limit` files of the least-recent
    /// listing of `path`. Nested mounts can contribute the same files more
    /// than once.
    pub fn suggest_removals(
        &self,
        path: &Path,
        threshold_percent: f32,
    ) -> Result<Vec<FileEntry>, InspectError> {
        let mut suggestions = Vec::new();
        for drive in self.drives.list_drives() {
            if !is_nearly_full(&drive, threshold_percent) || !contains_path(&drive, path) {
                continue;
            }

            debug!(
                "drive {} at {:.1}% holds {}; collecting removal candidates",
                drive.mount_point,
                drive.used_percent,
                path.display()
            );
            let listing = self
                .inspector
                .list_directory(path, SortMode::ByLeastRecentAccess)?;
            suggestions.extend(listing.files.iter().take(self.limit).cloned());
        }
        Ok(suggestions)
    }
}

fn is_nearly_full(drive: &DriveInfo, threshold_percent: f32) -> bool {
    drive.used_percent >= threshold_percent
}

// Component-wise, so a mount at `/home` does not claim `/homework`.
fn contains_path(drive: &DriveInfo, path: &Path) -> bool {
    !drive.mount_point.is_empty() && path.starts_with(Path::new(&drive.mount_point))
}
