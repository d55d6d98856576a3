//! cgroup v2 accounting module
//!
//! This module reads resource limits and usage (CPU, memory) for the
//! current container from Linux cgroups v2.
//!
//! # Example Usage
//!
//! ```ignore
//! use climb_usage::cgroups::CgroupReader;
//!
//! let cgroup = CgroupReader::default();
//!
//! let limit = cgroup.memory_max()?;        // Limit::Finite(bytes) or Limit::Unbounded
//! let memory = cgroup.memory_current()?;   // bytes
//! let cpu = cgroup.cpu_max()?;             // CpuMax { quota, period }
//! let stats = cgroup.cpu_stats()?;         // cumulative usage_usec etc.
//! ```

pub mod parse;
pub mod reader;

pub use parse::{CpuMax, CpuStats, Limit, ParseError};
pub use reader::{CgroupError, CgroupReader, CGROUP_ROOT};
