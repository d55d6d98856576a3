//! climb-usage - container resource usage for the notebook dashboard
//!
//! This library reads the notebook container's cgroup v2 accounting files
//! and serves memory, CPU, disk and GPU usage as JSON for the dashboard
//! widget.
//!
//! # Modules
//!
//! - `cgroups` - cgroup v2 accounting file readers and parsers
//! - `usage` - the usage sampler (CPU rate tracking, limits, disk, GPU, identity)
//! - `api` - axum router exposing the sampler over HTTP
//! - `config` - environment-based service configuration
//! - `metrics` - Prometheus metrics for observability
//! - `tracing` - logging and optional OpenTelemetry export
//!
//! # Quick Start
//!
//! ```ignore
//! use climb_usage::{api, CgroupReader, UsageSampler, Volume};
//!
//! let sampler = UsageSampler::new(CgroupReader::default(), vec![Volume::home("/home/jovyan")]);
//! let app = api::router(api::AppState::new(sampler, None), "/");
//! ```

pub mod api;
pub mod cgroups;
pub mod config;
pub mod metrics;
pub mod tracing;
pub mod usage;

// Re-export commonly used types at crate root for convenience
pub use cgroups::{CgroupReader, Limit};
pub use config::ServiceConfig;
pub use usage::{UsageSampler, Volume};
