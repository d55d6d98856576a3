//! cgroup v2 accounting file reader
//!
//! Reads the current container's own cgroup (the one mounted at
//! /sys/fs/cgroup inside the container):
//!
//! ```text
//! /sys/fs/cgroup/
//! ├── cpu.max          ← CPU limit: "200000 100000" = 2 cores
//! ├── cpu.stat         ← cumulative CPU usage counters
//! ├── memory.max       ← memory limit in bytes, or "max"
//! └── memory.current   ← resident memory in bytes
//! ```
//!
//! Every read goes to the kernel; nothing is cached.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::parse::{self, CpuMax, CpuStats, Limit, ParseError};

/// Base path for cgroup v2 filesystem
pub const CGROUP_ROOT: &str = "/sys/fs/cgroup";

pub const MEMORY_MAX: &str = "memory.max";
pub const MEMORY_CURRENT: &str = "memory.current";
pub const CPU_MAX: &str = "cpu.max";
pub const CPU_STAT: &str = "cpu.stat";

/// Error reading or parsing an accounting file
#[derive(Debug)]
pub enum CgroupError {
    /// The file could not be read (usually: it does not exist)
    Io { path: PathBuf, source: io::Error },
    /// The file was read but its content is malformed
    Parse { path: PathBuf, source: ParseError },
}

impl std::fmt::Display for CgroupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CgroupError::Io { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            CgroupError::Parse { path, source } => {
                write!(f, "Malformed {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for CgroupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CgroupError::Io { source, .. } => Some(source),
            CgroupError::Parse { source, .. } => Some(source),
        }
    }
}

/// Reads accounting files under a cgroup directory
#[derive(Debug, Clone)]
pub struct CgroupReader {
    root: PathBuf,
}

impl Default for CgroupReader {
    fn default() -> Self {
        Self::new(CGROUP_ROOT)
    }
}

impl CgroupReader {
    /// Create a reader for the cgroup mounted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cgroup directory this reader reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Read one accounting file, returning its raw text
    pub fn read_raw(&self, file: &str) -> Result<String, CgroupError> {
        let path = self.path(file);
        fs::read_to_string(&path).map_err(|source| CgroupError::Io { path, source })
    }

    fn read_with<T>(
        &self,
        file: &str,
        parse: impl FnOnce(&str) -> Result<T, ParseError>,
    ) -> Result<T, CgroupError> {
        let raw = self.read_raw(file)?;
        parse(&raw).map_err(|source| CgroupError::Parse {
            path: self.path(file),
            source,
        })
    }

    /// Memory limit from memory.max
    pub fn memory_max(&self) -> Result<Limit, CgroupError> {
        self.read_with(MEMORY_MAX, parse::parse_limit)
    }

    /// Current memory usage (in bytes) from memory.current
    pub fn memory_current(&self) -> Result<u64, CgroupError> {
        self.read_with(MEMORY_CURRENT, parse::parse_counter)
    }

    /// CPU bandwidth limit from cpu.max
    pub fn cpu_max(&self) -> Result<CpuMax, CgroupError> {
        self.read_with(CPU_MAX, parse::parse_cpu_max)
    }

    /// Whether cpu.stat exists (the cpu controller may not be enabled)
    pub fn has_cpu_stat(&self) -> bool {
        self.path(CPU_STAT).exists()
    }

    /// CPU usage counters from cpu.stat
    pub fn cpu_stats(&self) -> Result<CpuStats, CgroupError> {
        self.read_with(CPU_STAT, parse::parse_cpu_stat)
    }
}
