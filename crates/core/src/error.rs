use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read directory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("listing cache lock poisoned")]
    CacheLock,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no items selected for compression")]
    EmptySelection,
    #[error("item does not exist: {}", .0.display())]
    MissingItem(PathBuf),
    #[error("selected items share no common parent directory")]
    NoCommonParent,
    #[error("failed to archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to remove {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
