pub mod advisor;
pub mod archive;
pub mod cache;
pub mod config;
pub mod drives;
pub mod error;
pub mod inspect;
pub mod markdown;
pub mod model;
pub mod remove;
pub mod size;

pub use advisor::RemovalAdvisor;
pub use archive::{common_parent, create_archive, create_archive_at, ArchiveOutcome};
pub use cache::{ListingCache, ListingKey, DEFAULT_CACHE_CAPACITY};
pub use config::{
    load_config, InspectorConfig, DEFAULT_REMOVAL_THRESHOLD_PERCENT, DEFAULT_SUGGESTION_LIMIT,
};
pub use drives::{list_drives, DriveProbe, DriveSource, StaticDrives, SystemDrives};
pub use error::{ArchiveError, InspectError, RemoveError};
pub use inspect::{read_listing, sort_listing, DirectoryInspector, EntryOutcome};
pub use markdown::{human_bytes, render_directory_page, render_drive_table};
pub use model::{
    DirEntry, DirectoryListing, DriveInfo, EntrySkip, FileEntry, SizeBackendKind, SkipReason,
    SortMode,
};
pub use remove::remove_file;
pub use size::{
    backend_for, compute_directory_size, measure_subtree, NativeBackend, PduLibraryBackend,
    SizeBackend, SubtreeSize,
};
