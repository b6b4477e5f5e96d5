use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveInfo {
    pub device: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f32,
    #[serde(default)]
    pub file_system: Option<String>,
    #[serde(default)]
    pub is_removable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// A subdirectory with its recursively aggregated size.
///
/// `accessed` is the access time of the directory node itself. It does not
/// reflect reads of anything below it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub size_bytes: u64,
    pub accessed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SortMode {
    #[default]
    #[serde(rename = "size")]
    BySize,
    #[serde(rename = "recent")]
    ByRecentAccess,
    #[serde(rename = "least")]
    ByLeastRecentAccess,
}

impl SortMode {
    /// Maps a query-string value onto a sort mode. Anything unrecognized sorts
    /// by size.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "recent" => Self::ByRecentAccess,
            "least" => Self::ByLeastRecentAccess,
            _ => Self::BySize,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BySize => "size",
            Self::ByRecentAccess => "recent",
            Self::ByLeastRecentAccess => "least",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Vanished,
    PermissionDenied,
    Io(String),
}

impl SkipReason {
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::Vanished,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntrySkip {
    pub path: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryListing {
    pub path: String,
    pub sort: SortMode,
    pub files: Vec<FileEntry>,
    pub directories: Vec<DirEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<EntrySkip>,
}

impl DirectoryListing {
    pub fn empty(path: impl Into<String>, sort: SortMode) -> Self {
        Self {
            path: path.into(),
            sort,
            files: Vec::new(),
            directories: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizeBackendKind {
    #[default]
    Native,
    #[serde(alias = "pdu")]
    PduLibrary,
}
