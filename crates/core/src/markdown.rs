use chrono::{DateTime, Local, Utc};

use crate::model::{DirectoryListing, DriveInfo, FileEntry};

pub fn render_drive_table(drives: &[DriveInfo]) -> String {
    let mut out = String::new();
    out.push_str("# Drives\n\n");
    if drives.is_empty() {
        out.push_str("No drives detected.\n");
        return out;
    }

    out.push_str("| Device | Mount | Total | Used | Free | Used % |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for drive in drives {
        out.push_str(&format!(
            "| `{}` | `{}` | {} | {} | {} | {:.1}% |\n",
            drive.device,
            drive.mount_point,
            human_bytes(drive.total_bytes),
            human_bytes(drive.used_bytes),
            human_bytes(drive.free_bytes),
            drive.used_percent
        ));
    }
    out
}

pub fn render_directory_page(
    directory: &str,
    listing: &DirectoryListing,
    suggestions: &[FileEntry],
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# `{}`\n\n- Sorted by: `{}`\n- Files: {}\n- Directories: {}\n\n",
        directory,
        listing.sort.as_str(),
        listing.files.len(),
        listing.directories.len()
    ));

    out.push_str("## Directories\n\n");
    if listing.directories.is_empty() {
        out.push_str("No subdirectories.\n\n");
    } else {
        for dir in &listing.directories {
            out.push_str(&format!(
                "- `{}/` ({}), accessed {}\n",
                dir.name,
                human_bytes(dir.size_bytes),
                format_time(dir.accessed)
            ));
        }
        out.push('\n');
    }

    out.push_str("## Files\n\n");
    if listing.files.is_empty() {
        out.push_str("No files.\n\n");
    } else {
        for file in &listing.files {
            out.push_str(&format!(
                "- `{}` ({}), accessed {}, modified {}\n",
                file.name,
                human_bytes(file.size_bytes),
                format_time(file.accessed),
                format_time(file.modified)
            ));
        }
        out.push('\n');
    }

    if !suggestions.is_empty() {
        out.push_str("## Suggested for Removal\n\n");
        for file in suggestions {
            out.push_str(&format!(
                "- `{}` ({}), last accessed {}\n",
                file.path,
                human_bytes(file.size_bytes),
                format_time(file.accessed)
            ));
        }
        out.push('\n');
    }

    if !listing.skipped.is_empty() {
        out.push_str("## Skipped Entries\n\n");
        for skip in &listing.skipped {
            out.push_str(&format!("- `{}`: {:?}\n", skip.path, skip.reason));
        }
    }

    out
}

fn format_time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|time| {
            time.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn human_bytes(value: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if value == 0 {
        return "0 B".to_string();
    }
    let mut size = value as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}
