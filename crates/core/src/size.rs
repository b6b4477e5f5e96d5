use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::model::{EntrySkip, SizeBackendKind, SkipReason};

#[cfg(feature = "pdu-backend")]
use std::fs::Metadata;
#[cfg(feature = "pdu-backend")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "pdu-backend")]
use std::sync::Mutex;

#[cfg(feature = "pdu-backend")]
use parallel_disk_usage::{
    data_tree::DataTree,
    fs_tree_builder::FsTreeBuilder,
    get_size::GetSize,
    hardlink::HardlinkIgnorant,
    os_string_display::OsStringDisplay,
    reporter::{ErrorOnlyReporter, ErrorReport},
    size::Bytes,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeSize {
    pub total_bytes: u64,
    pub file_count: u64,
    pub skipped: Vec<EntrySkip>,
}

pub trait SizeBackend: Send + Sync {
    fn kind(&self) -> SizeBackendKind;

    fn measure(&self, root: &Path) -> SubtreeSize;
}

/// Sequential walk that never follows symlinks below the root, so link cycles
/// cannot occur and link targets are not counted twice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl SizeBackend for NativeBackend {
    fn kind(&self) -> SizeBackendKind {
        SizeBackendKind::Native
    }

    fn measure(&self, root: &Path) -> SubtreeSize {
        measure_subtree(root)
    }
}

/// Parallel walk via parallel-disk-usage. Like the native backend it counts
/// regular files only; directory nodes and symlinks weigh nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PduLibraryBackend;

impl SizeBackend for PduLibraryBackend {
    fn kind(&self) -> SizeBackendKind {
        SizeBackendKind::PduLibrary
    }

    #[cfg(feature = "pdu-backend")]
    fn measure(&self, root: &Path) -> SubtreeSize {
        let file_count = AtomicU64::new(0);
        let skipped = Mutex::new(Vec::new());
        let reporter = ErrorOnlyReporter::new(|report: ErrorReport<'_>| {
            let reason = SkipReason::from_io(&report.error);
            debug!("size walk skipped {}: {:?}", report.path.display(), reason);
            if let Ok(mut skipped) = skipped.lock() {
                skipped.push(EntrySkip {
                    path: report.path.to_string_lossy().to_string(),
                    reason,
                });
            }
        });
        let tree: DataTree<OsStringDisplay, Bytes> = FsTreeBuilder {
            root: root.to_path_buf(),
            size_getter: RegularFileSize {
                files: &file_count,
            },
            hardlinks_recorder: &HardlinkIgnorant,
            reporter: &reporter,
            max_depth: 0,
        }
        .into();
        drop(reporter);

        let total_bytes: u64 = tree.size().into();
        SubtreeSize {
            total_bytes,
            file_count: file_count.load(Ordering::Relaxed),
            skipped: skipped
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }

    #[cfg(not(feature = "pdu-backend"))]
    fn measure(&self, root: &Path) -> SubtreeSize {
        warn!(
            "pdu_library size backend unavailable in this build; measuring {} natively",
            root.display()
        );
        measure_subtree(root)
    }
}

#[cfg(feature = "pdu-backend")]
struct RegularFileSize<'a> {
    files: &'a AtomicU64,
}

#[cfg(feature = "pdu-backend")]
impl GetSize for RegularFileSize<'_> {
    type Size = Bytes;

    fn get_size(&self, metadata: &Metadata) -> Self::Size {
        if !metadata.file_type().is_file() {
            return Bytes::from(0);
        }
        self.files.fetch_add(1, Ordering::Relaxed);
        Bytes::from(metadata.len())
    }
}

pub fn backend_for(kind: &SizeBackendKind) -> Box<dyn SizeBackend> {
    match kind {
        SizeBackendKind::Native => Box::new(NativeBackend),
        SizeBackendKind::PduLibrary => Box::new(PduLibraryBackend),
    }
}

pub fn compute_directory_size(path: &Path) -> u64 {
    measure_subtree(path).total_bytes
}

pub fn measure_subtree(root: &Path) -> SubtreeSize {
    let mut result = SubtreeSize::default();

    for item in WalkDir::new(root).follow_links(false) {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .unwrap_or(root)
                    .to_string_lossy()
                    .to_string();
                let reason = err
                    .io_error()
                    .map(SkipReason::from_io)
                    .unwrap_or_else(|| SkipReason::Io(err.to_string()));
                if reason == SkipReason::PermissionDenied {
                    warn!("size walk skipped {}: permission denied", path);
                } else {
                    debug!("size walk skipped {}: {:?}", path, reason);
                }
                result.skipped.push(EntrySkip { path, reason });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => {
                result.total_bytes = result.total_bytes.saturating_add(metadata.len());
                result.file_count += 1;
            }
            Err(err) => {
                let reason = err
                    .io_error()
                    .map(SkipReason::from_io)
                    .unwrap_or_else(|| SkipReason::Io(err.to_string()));
                debug!(
                    "size walk skipped {}: {:?}",
                    entry.path().display(),
                    reason
                );
                result.skipped.push(EntrySkip {
                    path: entry.path().to_string_lossy().to_string(),
                    reason,
                });
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{backend_for, compute_directory_size, measure_subtree};
    use crate::model::{SizeBackendKind, SkipReason};

    #[test]
    fn sums_regular_files() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("a.bin"), vec![0_u8; 100]).expect("write a");
        fs::write(temp.path().join("b.bin"), vec![0_u8; 250]).expect("write b");
        fs::write(temp.path().join("empty"), b"").expect("write empty");

        assert_eq!(compute_directory_size(temp.path()), 350);
    }

    #[test]
    fn descends_into_nested_directories() {
        let temp = TempDir::new().expect("tempdir");
        let nested = temp.path().join("one").join("two");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(temp.path().join("top.txt"), vec![1_u8; 10]).expect("write top");
        fs::write(nested.join("deep.txt"), vec![1_u8; 32]).expect("write deep");

        let measured = measure_subtree(temp.path());
        assert_eq!(measured.total_bytes, 42);
        assert_eq!(measured.file_count, 2);
        assert!(measured.skipped.is_empty());
    }

    #[test]
    fn missing_root_is_recorded_not_fatal() {
        let temp = TempDir::new().expect("tempdir");
        let measured = measure_subtree(&temp.path().join("gone"));
        assert_eq!(measured.total_bytes, 0);
        assert_eq!(measured.skipped.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_do_not_loop() {
        let temp = TempDir::new().expect("tempdir");
        let inner = temp.path().join("inner");
        fs::create_dir(&inner).expect("mkdir");
        fs::write(inner.join("data"), vec![0_u8; 7]).expect("write");
        std::os::unix::fs::symlink(temp.path(), inner.join("loop")).expect("symlink");

        assert_eq!(compute_directory_size(temp.path()), 7);
    }

    #[cfg(feature = "pdu-backend")]
    #[test]
    fn pdu_backend_counts_regular_files_only() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("a.bin"), vec![0_u8; 100]).expect("write a");
        fs::write(temp.path().join("b.bin"), vec![0_u8; 250]).expect("write b");
        fs::write(temp.path().join("empty"), b"").expect("write empty");
        let nested = temp.path().join("nested");
        fs::create_dir(&nested).expect("mkdir");
        #[cfg(unix)]
        std::os::unix::fs::symlink(temp.path().join("a.bin"), nested.join("link"))
            .expect("symlink");

        let measured = backend_for(&SizeBackendKind::PduLibrary).measure(temp.path());
        assert_eq!(measured.total_bytes, 350);
        assert_eq!(measured.file_count, 3);
        assert!(measured.skipped.is_empty());
    }

    #[cfg(feature = "pdu-backend")]
    #[test]
    fn pdu_backend_records_missing_root() {
        let temp = TempDir::new().expect("tempdir");
        let measured = backend_for(&SizeBackendKind::PduLibrary).measure(&temp.path().join("gone"));
        assert_eq!(measured.total_bytes, 0);
        assert_eq!(measured.skipped.len(), 1);
        assert_eq!(measured.skipped[0].reason, SkipReason::Vanished);
    }

    #[test]
    fn native_backend_matches_free_function() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("x"), vec![0_u8; 64]).expect("write");
        let backend = backend_for(&SizeBackendKind::Native);
        assert_eq!(backend.kind(), SizeBackendKind::Native);
        assert_eq!(backend.measure(temp.path()).total_bytes, 64);
    }
}
