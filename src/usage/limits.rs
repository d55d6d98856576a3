//! Memory and CPU limits of the container
//!
//! The kernel reports both as possibly-unbounded values. The substitution
//! policy for `max` is applied here and only here:
//!
//! - memory: [`MEMORY_UNBOUNDED_BYTES`]
//! - CPU: [`CPU_UNBOUNDED`] (one full CPU)

use serde::Serialize;

use crate::cgroups::{CgroupError, CgroupReader, CpuMax, Limit};

/// Reported memory limit when memory.max is `max` (2^30 bytes = 1 GiB)
pub const MEMORY_UNBOUNDED_BYTES: u64 = 1 << 30;

/// Reported CPU limit when the cpu.max quota is `max`
pub const CPU_UNBOUNDED: f64 = 1.0;

/// Limits reported by the `limits` endpoint
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Memory limit in bytes
    pub max_memory: u64,
    /// Allotted CPUs (can be fractional, e.g., 0.5 for half a core)
    pub cpu_limit: f64,
}

/// Resolve a memory.max value to bytes
pub fn memory_limit(limit: Limit) -> u64 {
    limit.or(MEMORY_UNBOUNDED_BYTES)
}

/// Resolve a cpu.max value to allotted CPUs (quota / period)
pub fn cpu_limit(cpu: CpuMax) -> f64 {
    match cpu.quota {
        Limit::Finite(quota) => quota as f64 / cpu.period as f64,
        Limit::Unbounded => CPU_UNBOUNDED,
    }
}

impl Limits {
    /// Read both limits; either file missing or malformed is an error
    pub fn read(cgroup: &CgroupReader) -> Result<Self, CgroupError> {
        Ok(Self {
            max_memory: memory_limit(cgroup.memory_max()?),
            cpu_limit: cpu_limit(cgroup.cpu_max()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sentinel_is_exactly_one_gib() {
        assert_eq!(memory_limit(Limit::Unbounded), 1_073_741_824);
        assert_eq!(memory_limit(Limit::Finite(4096)), 4096);
    }

    #[test]
    fn test_cpu_limit() {
        let one = CpuMax {
            quota: Limit::Finite(100000),
            period: 100000,
        };
        assert_eq!(cpu_limit(one), 1.0);

        let unbounded = CpuMax {
            quota: Limit::Unbounded,
            period: 100000,
        };
        assert_eq!(cpu_limit(unbounded), 1.0);

        let half = CpuMax {
            quota: Limit::Finite(50000),
            period: 100000,
        };
        assert_eq!(cpu_limit(half), 0.5);

        let two = CpuMax {
            quota: Limit::Finite(200000),
            period: 100000,
        };
        assert_eq!(cpu_limit(two), 2.0);
    }

    #[test]
    fn test_read_limits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("memory.max"), "max\n").unwrap();
        std::fs::write(dir.path().join("cpu.max"), "max 100000\n").unwrap();

        let limits = Limits::read(&CgroupReader::new(dir.path())).unwrap();
        assert_eq!(
            limits,
            Limits {
                max_memory: 1 << 30,
                cpu_limit: 1.0,
            }
        );
    }

    #[test]
    fn test_read_limits_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cpu.max"), "max 100000\n").unwrap();

        assert!(Limits::read(&CgroupReader::new(dir.path())).is_err());
    }
}
