//! GPU queries
//!
//! Presence is taken from the container runtime: the NVIDIA container
//! toolkit sets `NVIDIA_VISIBLE_DEVICES` when a GPU is attached. Device
//! details come from the NVIDIA management library (NVML), which is loaded
//! at runtime; on hosts without a driver every query fails.

use serde::Serialize;

use super::env::EnvSource;

/// Set by the container runtime when a GPU is visible
pub const GPU_VISIBLE_VAR: &str = "NVIDIA_VISIBLE_DEVICES";

/// Whether a GPU has been made visible to this container
pub fn has_gpu(env: &dyn EnvSource) -> bool {
    env.var(GPU_VISIBLE_VAR).is_some()
}

/// Response of `gpu-info`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub name: String,
}

/// Response of `gpu-stats`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GpuStats {
    pub name: String,
    /// Percent of time a kernel was executing over the last sample period
    pub utilization_gpu: u32,
    /// Percent of time device memory was being read or written
    pub utilization_memory: u32,
    /// Bytes
    pub memory_used: u64,
    /// Bytes
    pub memory_total: u64,
}

/// Error type for GPU queries
#[derive(Debug)]
pub enum GpuError {
    /// Built without the `nvml` feature
    Unsupported,
    /// NVML could not be loaded or initialized (no driver)
    Init(String),
    /// No device at the requested index
    NoDevice(String),
    /// A device query failed
    Query(String),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::Unsupported => write!(f, "GPU support not compiled in"),
            GpuError::Init(msg) => write!(f, "Failed to initialize NVML: {}", msg),
            GpuError::NoDevice(msg) => write!(f, "No GPU device: {}", msg),
            GpuError::Query(msg) => write!(f, "GPU query failed: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {}

/// Source of GPU device information
pub trait GpuBackend: Send + Sync {
    /// Details of the first device
    fn info(&self) -> Result<GpuInfo, GpuError>;

    /// Utilization and memory of the first device
    fn stats(&self) -> Result<GpuStats, GpuError>;
}

/// Backend used when GPU support is compiled out
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGpu;

impl GpuBackend for NoGpu {
    fn info(&self) -> Result<GpuInfo, GpuError> {
        Err(GpuError::Unsupported)
    }

    fn stats(&self) -> Result<GpuStats, GpuError> {
        Err(GpuError::Unsupported)
    }
}

#[cfg(feature = "nvml")]
pub use self::nvml::NvmlBackend;

#[cfg(feature = "nvml")]
mod nvml {
    use nvml_wrapper::Nvml;

    use super::{GpuBackend, GpuError, GpuInfo, GpuStats};

    /// NVML-backed backend
    ///
    /// NVML is initialized per query so the service starts (and the other
    /// endpoints keep working) on hosts without a driver.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct NvmlBackend;

    impl NvmlBackend {
        fn with_first_device<T>(
            &self,
            f: impl FnOnce(&nvml_wrapper::Device<'_>) -> Result<T, nvml_wrapper::error::NvmlError>,
        ) -> Result<T, GpuError> {
            let nvml = Nvml::init().map_err(|e| GpuError::Init(e.to_string()))?;
            let device = nvml
                .device_by_index(0)
                .map_err(|e| GpuError::NoDevice(e.to_string()))?;
            f(&device).map_err(|e| GpuError::Query(e.to_string()))
        }
    }

    impl GpuBackend for NvmlBackend {
        fn info(&self) -> Result<GpuInfo, GpuError> {
            self.with_first_device(|device| {
                Ok(GpuInfo {
                    name: device.name()?,
                })
            })
        }

        fn stats(&self) -> Result<GpuStats, GpuError> {
            self.with_first_device(|device| {
                let utilization = device.utilization_rates()?;
                let memory = device.memory_info()?;
                Ok(GpuStats {
                    name: device.name()?,
                    utilization_gpu: utilization.gpu,
                    utilization_memory: utilization.memory,
                    memory_used: memory.used,
                    memory_total: memory.total,
                })
            })
        }
    }
}

/// The backend for this build: NVML when the `nvml` feature is enabled
pub fn default_backend() -> Box<dyn GpuBackend> {
    #[cfg(feature = "nvml")]
    {
        Box::new(NvmlBackend)
    }
    #[cfg(not(feature = "nvml"))]
    {
        Box::new(NoGpu)
    }
}
