use sysinfo::Disks;
use tracing::debug;

use crate::model::DriveInfo;

/// Raw per-partition numbers as reported by the platform, before usage is
/// derived.
#[derive(Debug, Clone)]
pub struct DriveProbe {
    pub device: String,
    pub mount_point: String,
    pub total_space_bytes: u64,
    pub available_space_bytes: u64,
    pub file_system: Option<String>,
    pub is_removable: bool,
}

/// Anything that can produce a current drive snapshot.
pub trait DriveSource: Send + Sync {
    fn list_drives(&self) -> Vec<DriveInfo>;
}

/// Mounted partitions as seen by `sysinfo`. Every call refreshes the list.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDrives;

impl DriveSource for SystemDrives {
    fn list_drives(&self) -> Vec<DriveInfo> {
        list_drives()
    }
}

/// A fixed snapshot, for callers that already hold drive statistics.
#[derive(Debug, Default, Clone)]
pub struct StaticDrives(pub Vec<DriveInfo>);

impl DriveSource for StaticDrives {
    fn list_drives(&self) -> Vec<DriveInfo> {
        self.0.clone()
    }
}

pub fn list_drives() -> Vec<DriveInfo> {
    let disks = Disks::new_with_refreshed_list();
    let probes = disks
        .list()
        .iter()
        .map(|disk| DriveProbe {
            device: disk.name().to_string_lossy().to_string(),
            mount_point: disk.mount_point().to_string_lossy().to_string(),
            total_space_bytes: disk.total_space(),
            available_space_bytes: disk.available_space(),
            file_system: Some(disk.file_system().to_string_lossy().to_string()),
            is_removable: disk.is_removable(),
        })
        .collect::<Vec<_>>();
    drives_from_probes(probes)
}

pub fn drives_from_probes(probes: Vec<DriveProbe>) -> Vec<DriveInfo> {
    probes.into_iter().filter_map(drive_from_probe).collect()
}

fn drive_from_probe(probe: DriveProbe) -> Option<DriveInfo> {
    // sysinfo reports zero capacity when statvfs fails for a mount.
    if probe.total_space_bytes == 0 {
        debug!(
            "skipping drive {} at {}: capacity statistics unavailable",
            probe.device, probe.mount_point
        );
        return None;
    }

    // `available_space` excludes blocks reserved for the superuser, so reserved
    // blocks count as used and `used_percent` is relative to total capacity.
    let free_bytes = probe.available_space_bytes.min(probe.total_space_bytes);
    let used_bytes = probe.total_space_bytes - free_bytes;

    Some(DriveInfo {
        device: probe.device,
        mount_point: probe.mount_point,
        total_bytes: probe.total_space_bytes,
        used_bytes,
        free_bytes,
        used_percent: used_percent(used_bytes, probe.total_space_bytes),
        file_system: probe.file_system.filter(|fs| !fs.is_empty()),
        is_removable: probe.is_removable,
    })
}

fn used_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let percent = used as f64 / total as f64 * 100.0;
    ((percent * 10.0).round() / 10.0) as f32
}

#[cfg(test)]
mod tests {
    use super::{drives_from_probes, DriveProbe};

    fn probe(mount: &str, total: u64, available: u64) -> DriveProbe {
        DriveProbe {
            device: format!("dev{mount}"),
            mount_point: mount.to_string(),
            total_space_bytes: total,
            available_space_bytes: available,
            file_system: Some("ext4".to_string()),
            is_removable: false,
        }
    }

    #[test]
    fn derives_used_space_and_percent() {
        let drives = drives_from_probes(vec![probe("/", 1_000, 150)]);
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].used_bytes, 850);
        assert_eq!(drives[0].free_bytes, 150);
        assert!((drives[0].used_percent - 85.0).abs() < f32::EPSILON);
    }

    #[test]
    fn skips_partitions_without_statistics() {
        let drives = drives_from_probes(vec![probe("/proc", 0, 0), probe("/data", 3, 2)]);
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].mount_point, "/data");
        assert!((drives[0].used_percent - 33.3).abs() < 0.01);
    }

    #[test]
    fn reserved_blocks_count_as_used() {
        // 1 000 blocks, 100 free to unprivileged users, 50 more held in reserve.
        let drives = drives_from_probes(vec![probe("/srv", 1_000, 100)]);
        assert_eq!(drives[0].used_bytes + drives[0].free_bytes, drives[0].total_bytes);
        assert_eq!(drives[0].used_bytes, 900);
        assert!((drives[0].used_percent - 90.0).abs() < f32::EPSILON);
    }

    #[test]
    fn available_space_is_clamped_to_capacity() {
        let drives = drives_from_probes(vec![probe("/tmp", 100, 400)]);
        assert_eq!(drives[0].used_bytes, 0);
        assert_eq!(drives[0].free_bytes, 100);
    }
}
