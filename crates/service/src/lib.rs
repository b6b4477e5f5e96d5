pub mod service;

pub use service::{
    ApiResponse, CompressRequest, DirectoryPage, DirectoryQuery, InspectorService,
    RemoveFileRequest,
};
