use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storage_inspector_core::{
    create_archive, remove_file, ArchiveError, DirectoryInspector, DirectoryListing, DriveInfo,
    DriveSource, FileEntry, InspectError, InspectorConfig, RemovalAdvisor, RemoveError, SortMode,
    SystemDrives,
};
use tracing::{debug, warn};

/// Status code and JSON body of one handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self { status, body },
            Err(err) => Self::error(500, format!("failed to serialize response: {err}")),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_sort() -> String {
    SortMode::BySize.as_str().to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveFileRequest {
    #[serde(default)]
    pub file_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressRequest {
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryPage {
    pub directory: String,
    pub data: DirectoryListing,
    pub suggestions: Vec<FileEntry>,
}

/// Request handlers for the inspection routes. One instance owns the listing
/// cache and is shared across requests.
pub struct InspectorService {
    config: InspectorConfig,
    drives: Arc<dyn DriveSource>,
    inspector: Arc<DirectoryInspector>,
    advisor: RemovalAdvisor,
}

impl InspectorService {
    pub fn new(config: InspectorConfig) -> Result<Self> {
        Self::with_drive_source(config, Arc::new(SystemDrives))
    }

    pub fn with_drive_source(
        config: InspectorConfig,
        drives: Arc<dyn DriveSource>,
    ) -> Result<Self> {
        config.validate()?;
        let inspector = Arc::new(DirectoryInspector::from_config(&config));
        debug!(
            "inspector ready: {:?} size backend, cache of {} listings",
            inspector.size_backend(),
            config.cache_capacity
        );
        let advisor = RemovalAdvisor::new(Arc::clone(&drives), Arc::clone(&inspector))
            .with_limit(config.suggestion_limit);
        Ok(Self {
            config,
            drives,
            inspector,
            advisor,
        })
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    pub fn drives(&self) -> Vec<DriveInfo> {
        self.drives.list_drives()
    }

    /// `GET /`
    pub fn home(&self) -> ApiResponse {
        ApiResponse::json(200, &self.drives())
    }

    /// `GET /directory`, as typed data for rendering.
    pub fn directory_page(&self, query: &DirectoryQuery) -> Result<DirectoryPage, ApiResponse> {
        let path = existing_path(&query.path)?;
        let sort = SortMode::parse_lenient(&query.sort);
        let listing = self.listing_or_empty(path, sort)?;

        let suggestions = match self
            .advisor
            .suggest_removals(path, self.config.removal_threshold_percent)
        {
            Ok(suggestions) => suggestions,
            Err(err) => {
                warn!("removal suggestions unavailable for {}: {}", path.display(), err);
                Vec::new()
            }
        };

        Ok(DirectoryPage {
            directory: query.path.clone(),
            data: listing.as_ref().clone(),
            suggestions,
        })
    }

    /// `GET /directory`
    pub fn directory_view(&self, query: &DirectoryQuery) -> ApiResponse {
        match self.directory_page(query) {
            Ok(page) => ApiResponse::json(200, &page),
            Err(response) => response,
        }
    }

    /// `GET /api/directory`
    pub fn api_directory(&self, query: &DirectoryQuery) -> ApiResponse {
        let listing = existing_path(&query.path).and_then(|path| {
            self.listing_or_empty(path, SortMode::parse_lenient(&query.sort))
        });
        match listing {
            Ok(listing) => ApiResponse::json(200, listing.as_ref()),
            Err(response) => response,
        }
    }

    /// `POST /api/remove_file`. Cached listings still show the removed file.
    pub fn remove_file(&self, request: &RemoveFileRequest) -> ApiResponse {
        match remove_file(Path::new(&request.file_path)) {
            Ok(()) => ApiResponse::json(
                200,
                &json!({ "success": true, "updated_drive_info": self.drives() }),
            ),
            Err(RemoveError::NotFound(_)) => ApiResponse::error(404, "File does not exist"),
            Err(err @ RemoveError::Io { .. }) => {
                warn!("{}", err);
                ApiResponse::error(500, io_message(&err))
            }
        }
    }

    /// `POST /api/compress`
    pub fn compress(&self, request: &CompressRequest) -> ApiResponse {
        let items = request.items.iter().map(PathBuf::from).collect::<Vec<_>>();
        match create_archive(&items) {
            Ok(outcome) => ApiResponse::json(
                200,
                &json!({
                    "success": true,
                    "message": outcome.message(),
                    "archive_path": outcome.archive_path,
                }),
            ),
            Err(err) => {
                let status = match err {
                    ArchiveError::EmptySelection
                    | ArchiveError::MissingItem(_)
                    | ArchiveError::NoCommonParent => 400,
                    ArchiveError::Io { .. } | ArchiveError::Zip(_) => 500,
                };
                debug!("compress request rejected: {}", err);
                ApiResponse::json(status, &json!({ "success": false, "error": err.to_string() }))
            }
        }
    }

    fn listing_or_empty(
        &self,
        path: &Path,
        sort: SortMode,
    ) -> Result<Arc<DirectoryListing>, ApiResponse> {
        match self.inspector.list_directory(path, sort) {
            Ok(listing) => Ok(listing),
            Err(InspectError::NotFound(_)) => Err(path_missing()),
            Err(err @ InspectError::Unreadable { .. }) => {
                warn!("{}", err);
                Ok(Arc::new(DirectoryListing::empty(path.to_string_lossy(), sort)))
            }
            Err(err @ InspectError::CacheLock) => Err(ApiResponse::error(500, err.to_string())),
        }
    }
}

fn existing_path(raw: &str) -> Result<&Path, ApiResponse> {
    let path = Path::new(raw);
    if raw.is_empty() || !path.exists() {
        return Err(path_missing());
    }
    Ok(path)
}

fn path_missing() -> ApiResponse {
    ApiResponse::error(404, "Path does not exist")
}

// The OS message alone, without the path prefix added by `RemoveError`.
fn io_message(err: &RemoveError) -> String {
    match err {
        RemoveError::Io { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}
