//! Disk usage of the user's volumes
//!
//! Each volume is queried with statvfs(3). Numbers follow the `df`
//! convention: `used` counts blocks not free to anyone, `free` counts blocks
//! available to unprivileged users, so `used + free` can be less than
//! `total` on filesystems with reserved blocks.

use std::path::{Path, PathBuf};

use nix::sys::statvfs::{statvfs, Statvfs};
use serde::Serialize;

/// A volume shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    /// Human-readable name ("Home")
    pub label: String,
    /// DOM id used by the dashboard widget
    pub id_prefix: String,
    /// Mount point or directory to query
    pub path: PathBuf,
}

impl Volume {
    pub fn new(label: &str, id_prefix: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.to_string(),
            id_prefix: id_prefix.to_string(),
            path: path.into(),
        }
    }

    /// The user's home directory (always listed)
    pub fn home(path: impl Into<PathBuf>) -> Self {
        Self::new("Home", "home", path)
    }

    /// The team's shared directory (listed only if mounted)
    pub fn shared_team(path: impl Into<PathBuf>) -> Self {
        Self::new("Shared team", "shared-team", path)
    }
}

/// Space statistics in bytes
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct DiskStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// used / (used + free), as a percentage rounded to one decimal
    pub percent: f64,
}

impl DiskStats {
    fn from_statvfs(stat: &Statvfs) -> Self {
        // `fsblkcnt_t` is a `u32` on some platforms but a `u64` on Linux.
        #[allow(clippy::useless_conversion, clippy::unnecessary_cast)]
        let fragment = stat.fragment_size() as u64;
        #[allow(clippy::useless_conversion, clippy::unnecessary_cast)]
        let (blocks, blocks_free, blocks_available) = (
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.blocks_available() as u64,
        );

        Self::from_bytes(
            blocks * fragment,
            blocks.saturating_sub(blocks_free) * fragment,
            blocks_available * fragment,
        )
    }

    /// Build stats from byte counts, deriving `percent`
    pub fn from_bytes(total: u64, used: u64, free: u64) -> Self {
        let visible = used + free;
        let percent = if visible == 0 {
            0.0
        } else {
            (used as f64 / visible as f64 * 1000.0).round() / 10.0
        };
        Self { total, used, free, percent }
    }
}

/// One row of the `disk-usage` response
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DiskUsageEntry {
    pub label: String,
    pub id_prefix: String,
    pub data: DiskStats,
}

/// statvfs failed on a path that exists
#[derive(Debug)]
pub struct DiskError {
    pub path: PathBuf,
    pub source: nix::Error,
}

impl std::fmt::Display for DiskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "statvfs({}) failed: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for DiskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Query space statistics for a single path
pub fn disk_stats(path: &Path) -> Result<DiskStats, DiskError> {
    let stat = statvfs(path).map_err(|source| DiskError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(DiskStats::from_statvfs(&stat))
}

/// Query every volume in order, skipping those whose path doesn't exist
pub fn disk_usage(volumes: &[Volume]) -> Result<Vec<DiskUsageEntry>, DiskError> {
    volumes
        .iter()
        .filter(|volume| volume.path.exists())
        .map(|volume| {
            Ok(DiskUsageEntry {
                label: volume.label.clone(),
                id_prefix: volume.id_prefix.clone(),
                data: disk_stats(&volume.path)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        let stats = DiskStats::from_bytes(1000, 250, 750);
        assert_eq!(stats.percent, 25.0);

        let stats = DiskStats::from_bytes(1000, 1, 2);
        assert_eq!(stats.percent, 33.3);

        assert_eq!(DiskStats::from_bytes(0, 0, 0).percent, 0.0);
    }

    #[test]
    fn test_stats_for_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let stats = disk_stats(dir.path()).unwrap();

        assert!(stats.total > 0);
        assert!(stats.used <= stats.total);
        assert!(stats.free <= stats.total);
    }

    #[test]
    fn test_missing_volume_is_omitted() {
        let home = tempfile::tempdir().unwrap();
        let volumes = vec![
            Volume::home(home.path()),
            Volume::shared_team("/definitely/not/mounted/shared/team"),
        ];

        let entries = disk_usage(&volumes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "Home");
        assert_eq!(entries[0].id_prefix, "home");
    }

    #[test]
    fn test_order_is_preserved() {
        let home = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        let volumes = vec![Volume::home(home.path()), Volume::shared_team(shared.path())];

        let prefixes: Vec<String> = disk_usage(&volumes)
            .unwrap()
            .into_iter()
            .map(|e| e.id_prefix)
            .collect();
        assert_eq!(prefixes, vec!["home", "shared-team"]);
    }
}
