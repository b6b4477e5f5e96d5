use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use storage_inspector_core::{DriveInfo, InspectorConfig, StaticDrives};
use storage_inspector_service::{
    CompressRequest, DirectoryQuery, InspectorService, RemoveFileRequest,
};
use tempfile::TempDir;

fn nearly_full_service(mount: &Path) -> InspectorService {
    let drive = DriveInfo {
        device: "fixture".to_string(),
        mount_point: mount.to_string_lossy().to_string(),
        total_bytes: 1_000,
        used_bytes: 900,
        free_bytes: 100,
        used_percent: 90.0,
        file_system: Some("ext4".to_string()),
        is_removable: false,
    };
    InspectorService::with_drive_source(
        InspectorConfig::default(),
        Arc::new(StaticDrives(vec![drive])),
    )
    .expect("service builds")
}

fn query(path: &Path, sort: &str) -> DirectoryQuery {
    DirectoryQuery {
        path: path.to_string_lossy().to_string(),
        sort: sort.to_string(),
    }
}

#[test]
fn browse_compress_and_remove_flow() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    fs::write(root.join("report.pdf"), vec![0_u8; 2_048]).expect("write report");
    fs::write(root.join("notes.txt"), vec![0_u8; 12]).expect("write notes");
    fs::create_dir(root.join("photos")).expect("mkdir photos");
    fs::write(root.join("photos").join("a.jpg"), vec![0_u8; 512]).expect("write photo");

    let service = nearly_full_service(root);

    let home = service.home();
    assert_eq!(home.status, 200);
    assert_eq!(home.body[0]["mount_point"], root.to_string_lossy().to_string());

    let view = service.directory_view(&query(root, "least"));
    assert_eq!(view.status, 200);
    assert_eq!(view.body["data"]["sort"], "least");
    assert_eq!(view.body["data"]["directories"][0]["size_bytes"], 512);
    assert_eq!(view.body["suggestions"].as_array().map(Vec::len), Some(2));

    let compressed = service.compress(&CompressRequest {
        items: vec![
            root.join("notes.txt").to_string_lossy().to_string(),
            root.join("photos").to_string_lossy().to_string(),
        ],
    });
    assert_eq!(compressed.status, 200);
    let archive_path = compressed.body["archive_path"]
        .as_str()
        .expect("archive path")
        .to_string();
    assert!(Path::new(&archive_path).starts_with(root));
    assert!(Path::new(&archive_path).exists());

    let removed = service.remove_file(&RemoveFileRequest {
        file_path: root.join("report.pdf").to_string_lossy().to_string(),
    });
    assert_eq!(removed.status, 200);
    assert!(!root.join("report.pdf").exists());
}

#[test]
fn missing_paths_share_one_error_payload() {
    let temp = TempDir::new().expect("tempdir");
    let service = nearly_full_service(temp.path());
    let missing = temp.path().join("absent");

    for response in [
        service.directory_view(&query(&missing, "size")),
        service.api_directory(&query(&missing, "recent")),
    ] {
        assert_eq!(response.status, 404);
        assert_eq!(response.body, json!({ "error": "Path does not exist" }));
    }
}

#[test]
fn compress_without_items_is_a_client_error() {
    let temp = TempDir::new().expect("tempdir");
    let service = nearly_full_service(temp.path());

    let response = service.compress(&CompressRequest::default());
    assert_eq!(response.status, 400);
    assert_eq!(response.body["success"], false);
}
