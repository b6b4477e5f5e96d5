use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveOutcome {
    pub archive_path: String,
    pub parent: String,
    pub files_added: u64,
    pub directories_added: u64,
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl ArchiveOutcome {
    pub fn message(&self) -> String {
        format!(
            "Created {} with {} file(s) and {} folder(s)",
            self.archive_path, self.files_added, self.directories_added
        )
    }
}

/// Zips `items` into a timestamped archive placed in their common parent.
pub fn create_archive(items: &[PathBuf]) -> Result<ArchiveOutcome, ArchiveError> {
    create_archive_at(items, Local::now().naive_local())
}

pub fn create_archive_at(
    items: &[PathBuf],
    stamp: NaiveDateTime,
) -> Result<ArchiveOutcome, ArchiveError> {
    if items.is_empty() {
        return Err(ArchiveError::EmptySelection);
    }
    for item in items {
        match item.try_exists() {
            Ok(true) => {}
            Ok(false) => return Err(ArchiveError::MissingItem(item.clone())),
            Err(source) => {
                return Err(ArchiveError::Io {
                    path: item.clone(),
                    source,
                })
            }
        }
    }

    let parent = common_parent(items).ok_or(ArchiveError::NoCommonParent)?;
    let roots = outermost_items(items);
    let archive_path = unique_archive_path(&parent, stamp);

    let result = write_archive(&archive_path, &parent, &roots);
    match result {
        Ok((files_added, directories_added, skipped)) => {
            info!(
                "archived {} item(s) into {}",
                roots.len(),
                archive_path.display()
            );
            Ok(ArchiveOutcome {
                archive_path: archive_path.to_string_lossy().to_string(),
                parent: parent.to_string_lossy().to_string(),
                files_added,
                directories_added,
                skipped,
            })
        }
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&archive_path) {
                debug!(
                    "could not remove partial archive {}: {}",
                    archive_path.display(),
                    cleanup
                );
            }
            Err(err)
        }
    }
}

type WriteCounts = (u64, u64, Vec<String>);

fn write_archive(
    archive_path: &Path,
    parent: &Path,
    roots: &[PathBuf],
) -> Result<WriteCounts, ArchiveError> {
    let file = File::create(archive_path).map_err(|source| ArchiveError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);

    let mut files_added = 0_u64;
    let mut directories_added = 0_u64;
    let mut skipped = Vec::new();

    for root in roots {
        if !root.is_dir() {
            add_file(&mut writer, parent, root)?;
            files_added += 1;
            continue;
        }

        for item in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("archive walk error under {}: {}", root.display(), err);
                    skipped.push(
                        err.path()
                            .unwrap_or(root)
                            .to_string_lossy()
                            .to_string(),
                    );
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_dir() {
                let name = format!("{}/", entry_name(parent, path));
                writer.add_directory(name, member_options(0))?;
                directories_added += 1;
            } else if entry.file_type().is_file() {
                if path == archive_path {
                    continue;
                }
                match add_file(&mut writer, parent, path) {
                    Ok(()) => files_added += 1,
                    Err(ArchiveError::Io { path, source }) => {
                        warn!("archive skipped {}: {}", path.display(), source);
                        skipped.push(path.to_string_lossy().to_string());
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    writer.finish()?;
    Ok((files_added, directories_added, skipped))
}

/// Members at or past the 32-bit size limit need zip64 headers.
fn member_options(len: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(len >= u64::from(u32::MAX))
}

// An unreadable file leaves no member behind, so the caller may skip it and
// keep writing.
fn add_file(writer: &mut ZipWriter<File>, parent: &Path, path: &Path) -> Result<(), ArchiveError> {
    let io_error = |source: io::Error| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut source = File::open(path).map_err(io_error)?;
    let len = source.metadata().map_err(io_error)?.len();
    writer.start_file(entry_name(parent, path), member_options(len))?;
    if let Err(err) = io::copy(&mut source, writer) {
        writer.abort_file()?;
        return Err(io_error(err));
    }
    Ok(())
}

/// Archive member name for `path`, relative to `parent` and `/`-separated.
fn entry_name(parent: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(parent).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Deepest directory that is an ancestor of every item. `None` for relative
/// items, filesystem roots, or items on different volumes.
pub fn common_parent(items: &[PathBuf]) -> Option<PathBuf> {
    let mut parents = items.iter().map(|item| item.parent());
    let mut common = parents.next()??.to_path_buf();
    for parent in parents {
        common = shared_prefix(&common, parent?);
    }

    if common.as_os_str().is_empty() || !common.has_root() {
        return None;
    }
    Some(common)
}

fn shared_prefix(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(left, right)| left == right)
        .map(|(component, _)| component)
        .collect()
}

// Items already covered by another selected directory would be written twice.
fn outermost_items(items: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for item in items {
        let covered = items
            .iter()
            .any(|other| other != item && item.starts_with(other));
        if covered || roots.contains(item) {
            debug!("{} is already included by another selection", item.display());
            continue;
        }
        roots.push(item.clone());
    }
    roots
}

fn unique_archive_path(parent: &Path, stamp: NaiveDateTime) -> PathBuf {
    let base = format!("archive_{}", stamp.format("%Y%m%d_%H%M%S"));
    let mut candidate = parent.join(format!("{base}.zip"));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{base}_{suffix}.zip"));
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use tempfile::TempDir;
    use zip::ZipArchive;

    use super::{common_parent, create_archive_at};
    use crate::error::ArchiveError;

    fn stamp() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid timestamp")
    }

    fn member_names(path: &str) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).expect("open archive")).expect("zip");
        let mut names = (0..archive.len())
            .map(|index| archive.by_index(index).expect("member").name().to_string())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn files_and_directories_are_stored_relative_to_common_parent() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("x.txt"), b"hello").expect("write x");
        fs::create_dir_all(root.join("sub").join("deeper")).expect("mkdir");
        fs::write(root.join("sub").join("y.txt"), b"why").expect("write y");
        fs::write(root.join("sub").join("deeper").join("z.txt"), b"zed").expect("write z");
        fs::write(root.join("left-out.txt"), b"no").expect("write other");

        let outcome = create_archive_at(&[root.join("x.txt"), root.join("sub")], stamp())
            .expect("archive");

        assert_eq!(
            PathBuf::from(&outcome.archive_path),
            root.join("archive_20261018_093000.zip")
        );
        assert_eq!(outcome.files_added, 3);
        assert_eq!(outcome.directories_added, 2);
        assert_eq!(
            member_names(&outcome.archive_path),
            vec!["sub/", "sub/deeper/", "sub/deeper/z.txt", "sub/y.txt", "x.txt"]
        );
    }

    #[test]
    fn same_second_archives_do_not_collide() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("a.txt"), b"a").expect("write");
        let items = vec![temp.path().join("a.txt")];

        let first = create_archive_at(&items, stamp()).expect("first");
        let second = create_archive_at(&items, stamp()).expect("second");
        assert_ne!(first.archive_path, second.archive_path);
        assert!(second.archive_path.ends_with("archive_20261018_093000_1.zip"));
    }

    #[test]
    fn missing_item_is_reported() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("here.txt"), b"1").expect("write");
        let err = create_archive_at(
            &[temp.path().join("here.txt"), temp.path().join("gone.txt")],
            stamp(),
        )
        .expect_err("missing item");
        assert!(matches!(err, ArchiveError::MissingItem(path) if path.ends_with("gone.txt")));
    }

    #[test]
    fn empty_selection_is_rejected() {
        assert!(matches!(
            create_archive_at(&[], stamp()),
            Err(ArchiveError::EmptySelection)
        ));
    }

    #[test]
    fn nested_selection_is_written_once() {
        let temp = TempDir::new().expect("tempdir");
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        fs::write(sub.join("inner.txt"), b"once").expect("write");

        let outcome =
            create_archive_at(&[sub.clone(), sub.join("inner.txt")], stamp()).expect("archive");
        assert_eq!(outcome.files_added, 1);
        assert_eq!(member_names(&outcome.archive_path), vec!["sub/", "sub/inner.txt"]);
    }

    #[test]
    fn members_past_four_gib_are_written_as_zip64() {
        let temp = TempDir::new().expect("tempdir");
        let big = temp.path().join("big.img");
        let len = u64::from(u32::MAX) + 1_024;
        File::create(&big)
            .expect("create sparse file")
            .set_len(len)
            .expect("extend sparse file");

        let outcome = create_archive_at(&[big], stamp()).expect("archive");
        assert_eq!(outcome.files_added, 1);

        let mut archive =
            ZipArchive::new(File::open(&outcome.archive_path).expect("open")).expect("zip");
        assert_eq!(archive.by_name("big.img").expect("member").size(), len);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_inside_selected_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("tempdir");
        let sub = temp.path().join("sub");
        fs::create_dir(&sub).expect("mkdir");
        fs::write(sub.join("ok.txt"), b"fine").expect("write ok");
        let locked = sub.join("locked.txt");
        fs::write(&locked, b"secret").expect("write locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");
        if File::open(&locked).is_ok() {
            // Privileged users read through the mode bits.
            return;
        }

        let outcome = create_archive_at(&[sub.clone()], stamp()).expect("archive");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).expect("chmod back");

        assert_eq!(outcome.files_added, 1);
        assert_eq!(outcome.skipped, vec![locked.to_string_lossy().to_string()]);
        assert_eq!(member_names(&outcome.archive_path), vec!["sub/", "sub/ok.txt"]);
    }

    #[test]
    fn common_parent_requires_shared_absolute_ancestor() {
        let base = std::env::temp_dir();
        assert_eq!(
            common_parent(&[base.join("a").join("x.txt"), base.join("a").join("sub")]),
            Some(base.join("a"))
        );
        assert_eq!(
            common_parent(&[base.join("a").join("b").join("c"), base.join("a").join("d")]),
            Some(base.join("a"))
        );
        assert_eq!(common_parent(&[PathBuf::from("relative.txt")]), None);
    }
}
