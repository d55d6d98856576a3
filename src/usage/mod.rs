//! Usage sampling
//!
//! The [`UsageSampler`] composes the individual readers into the values the
//! dashboard asks for:
//!
//! ```text
//! CgroupReader ──► Limits (memory.max, cpu.max)
//!              ──► memory.current
//!              ──► CpuRateTracker (cpu.stat, previous sample)
//! EnvSource    ──► Identity, has_gpu
//! statvfs      ──► DiskUsageEntry per volume
//! GpuBackend   ──► GpuInfo, GpuStats
//! ```
//!
//! One sampler lives for the whole process. It owns the CPU rate tracker,
//! so the CPU window is shared by every request served from it.

pub mod cpu;
pub mod disk;
pub mod env;
pub mod gpu;
pub mod identity;
pub mod limits;

use serde::Serialize;
use tracing::warn;

use crate::cgroups::{CgroupError, CgroupReader};
use crate::metrics::{CPU_RATE, MEMORY_BYTES};

pub use cpu::{CpuRateTracker, CpuSample};
pub use disk::{DiskError, DiskStats, DiskUsageEntry, Volume};
pub use env::{EnvSource, ProcessEnv, StaticEnv};
pub use gpu::{GpuBackend, GpuError, GpuInfo, GpuStats, NoGpu};
pub use identity::Identity;
pub use limits::{Limits, CPU_UNBOUNDED, MEMORY_UNBOUNDED_BYTES};

/// Error type for sampling operations
#[derive(Debug)]
pub enum UsageError {
    /// A required cgroup file was missing or malformed
    Cgroup(CgroupError),
    /// A volume could not be queried
    Disk(DiskError),
    /// GPU query failed
    Gpu(GpuError),
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageError::Cgroup(e) => write!(f, "cgroup error: {}", e),
            UsageError::Disk(e) => write!(f, "disk error: {}", e),
            UsageError::Gpu(e) => write!(f, "gpu error: {}", e),
        }
    }
}

impl std::error::Error for UsageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UsageError::Cgroup(e) => Some(e),
            UsageError::Disk(e) => Some(e),
            UsageError::Gpu(e) => Some(e),
        }
    }
}

impl From<CgroupError> for UsageError {
    fn from(e: CgroupError) -> Self {
        UsageError::Cgroup(e)
    }
}

impl From<DiskError> for UsageError {
    fn from(e: DiskError) -> Self {
        UsageError::Disk(e)
    }
}

impl From<GpuError> for UsageError {
    fn from(e: GpuError) -> Self {
        UsageError::Gpu(e)
    }
}

/// Consolidated response of the `resources` endpoint
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Resources {
    /// Current memory usage in bytes
    pub memory_now: u64,
    /// CPU utilization as a fraction of the container's own allotment
    pub cpu_now: f64,
    /// Memory limit in bytes
    pub memory_max: u64,
    /// Allotted CPUs
    pub cpus: f64,
}

impl Resources {
    /// Combine raw readings, scaling the CPU rate by the CPU limit
    pub fn new(memory_now: u64, cpu_rate: f64, limits: Limits) -> Self {
        Self {
            memory_now,
            cpu_now: utilization(cpu_rate, limits.cpu_limit),
            memory_max: limits.max_memory,
            cpus: limits.cpu_limit,
        }
    }
}

/// `cpu_rate / cpu_limit`, or 0.0 when the limit is zero, negative or not
/// finite
pub fn utilization(cpu_rate: f64, cpu_limit: f64) -> f64 {
    if !cpu_limit.is_finite() || cpu_limit <= 0.0 {
        warn!(cpu_limit, "CPU limit is not a positive number, reporting 0 utilization");
        return 0.0;
    }
    cpu_rate / cpu_limit
}

/// Reads every metric the dashboard displays
pub struct UsageSampler {
    cgroup: CgroupReader,
    cpu: CpuRateTracker,
    volumes: Vec<Volume>,
    env: Box<dyn EnvSource>,
    gpu: Box<dyn GpuBackend>,
}

impl UsageSampler {
    /// Create a sampler reading the real environment and the default GPU
    /// backend
    pub fn new(cgroup: CgroupReader, volumes: Vec<Volume>) -> Self {
        Self {
            cgroup,
            cpu: CpuRateTracker::new(),
            volumes,
            env: Box::new(ProcessEnv),
            gpu: gpu::default_backend(),
        }
    }

    /// Replace the environment source
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Replace the GPU backend
    pub fn with_gpu(mut self, gpu: impl GpuBackend + 'static) -> Self {
        self.gpu = Box::new(gpu);
        self
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// The process-wide CPU rate tracker
    pub fn cpu_tracker(&self) -> &CpuRateTracker {
        &self.cpu
    }

    pub fn identity(&self) -> Identity {
        Identity::resolve(self.env.as_ref())
    }

    pub fn limits(&self) -> Result<Limits, UsageError> {
        Ok(Limits::read(&self.cgroup)?)
    }

    /// memory.current in bytes
    pub fn current_memory(&self) -> Result<u64, UsageError> {
        let bytes = self.cgroup.memory_current()?;
        MEMORY_BYTES.set(bytes as f64);
        Ok(bytes)
    }

    /// CPUs busy since the previous call (unscaled)
    pub fn cpu_usage(&self) -> Result<f64, UsageError> {
        let rate = self.cpu.sample(&self.cgroup)?;
        CPU_RATE.set(rate);
        Ok(rate)
    }

    /// Memory, CPU utilization and limits in one read
    pub fn resources(&self) -> Result<Resources, UsageError> {
        let limits = self.limits()?;
        let memory_now = self.current_memory()?;
        let cpu_rate = self.cpu_usage()?;
        Ok(Resources::new(memory_now, cpu_rate, limits))
    }

    pub fn disk_usage(&self) -> Result<Vec<DiskUsageEntry>, UsageError> {
        Ok(disk::disk_usage(&self.volumes)?)
    }

    pub fn has_gpu(&self) -> bool {
        gpu::has_gpu(self.env.as_ref())
    }

    pub fn gpu_info(&self) -> Result<GpuInfo, UsageError> {
        Ok(self.gpu.info()?)
    }

    pub fn gpu_stats(&self) -> Result<GpuStats, UsageError> {
        Ok(self.gpu.stats()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct FakeGpu;

    impl GpuBackend for FakeGpu {
        fn info(&self) -> Result<GpuInfo, GpuError> {
            Ok(GpuInfo {
                name: "Tesla T4".to_string(),
            })
        }

        fn stats(&self) -> Result<GpuStats, GpuError> {
            Ok(GpuStats {
                name: "Tesla T4".to_string(),
                utilization_gpu: 40,
                utilization_memory: 10,
                memory_used: 1 << 30,
                memory_total: 16 << 30,
            })
        }
    }

    fn sampler(dir: &tempfile::TempDir) -> UsageSampler {
        UsageSampler::new(CgroupReader::new(dir.path()), vec![Volume::home(dir.path())])
            .with_env(StaticEnv::new())
            .with_gpu(NoGpu)
    }

    #[test]
    fn test_resources_scales_cpu_by_limit() {
        let limits = Limits {
            max_memory: 8 << 30,
            cpu_limit: 4.0,
        };
        let resources = Resources::new(5_000_000, 2.0, limits);

        assert_eq!(
            resources,
            Resources {
                memory_now: 5_000_000,
                cpu_now: 0.5,
                memory_max: 8 << 30,
                cpus: 4.0,
            }
        );
    }

    #[test]
    fn test_utilization_guards_zero_limit() {
        assert_eq!(utilization(2.0, 0.0), 0.0);
        assert_eq!(utilization(2.0, -1.0), 0.0);
        assert_eq!(utilization(2.0, f64::INFINITY), 0.0);
        assert_eq!(utilization(1.0, 2.0), 0.5);
    }

    #[test]
    fn test_resources_from_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("memory.current"), "5000000\n").unwrap();
        fs::write(dir.path().join("memory.max"), "8589934592\n").unwrap();
        fs::write(dir.path().join("cpu.max"), "400000 100000\n").unwrap();
        fs::write(dir.path().join("cpu.stat"), "usage_usec 100\n").unwrap();

        let sampler = sampler(&dir);
        let resources = sampler.resources().unwrap();

        // First sample has nothing to diff against
        assert_eq!(resources.cpu_now, 0.0);
        assert_eq!(resources.memory_now, 5_000_000);
        assert_eq!(resources.memory_max, 8_589_934_592);
        assert_eq!(resources.cpus, 4.0);
        assert!(sampler.cpu_tracker().last_sample().is_some());
    }

    #[test]
    fn test_resources_missing_memory_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = sampler(&dir).resources().unwrap_err();
        assert!(matches!(err, UsageError::Cgroup(CgroupError::Io { .. })));
    }

    #[test]
    fn test_resources_failure_leaves_cpu_window_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("memory.current"), "5000000\n").unwrap();
        fs::write(dir.path().join("cpu.stat"), "usage_usec 100\n").unwrap();

        let sampler = sampler(&dir);
        assert!(sampler.resources().is_err());
        assert!(sampler.cpu_tracker().last_sample().is_none());
    }

    #[test]
    fn test_gpu_queries() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = UsageSampler::new(CgroupReader::new(dir.path()), Vec::new())
            .with_env(StaticEnv::new().with(gpu::GPU_VISIBLE_VAR, "all"))
            .with_gpu(FakeGpu);

        assert!(sampler.has_gpu());
        assert_eq!(sampler.gpu_info().unwrap().name, "Tesla T4");
        assert_eq!(sampler.gpu_stats().unwrap().utilization_gpu, 40);
    }

    #[test]
    fn test_gpu_info_without_device_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(sampler(&dir).gpu_info(), Err(UsageError::Gpu(_))));
    }
}
