//! Parsers for cgroup v2 accounting file formats
//!
//! The kernel uses a handful of ad-hoc text formats:
//!
//! ```text
//! memory.max      "4294967296\n"  or  "max\n"
//! memory.current  "123456789\n"
//! cpu.max         "200000 100000\n"  or  "max 100000\n"
//! cpu.stat        "usage_usec 1234\nuser_usec 1000\nsystem_usec 234\n..."
//! ```
//!
//! `max` is the kernel's "no limit" sentinel. It is parsed into
//! [`Limit::Unbounded`] here and never compared as a string anywhere else.

use std::collections::HashMap;

/// Sentinel the kernel writes for an unbounded limit
pub const UNBOUNDED: &str = "max";

/// A limit value as written by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// A concrete value (bytes for memory, microseconds for CPU quota)
    Finite(u64),
    /// The `max` sentinel
    Unbounded,
}

impl Limit {
    /// Resolve the limit, substituting `fallback` when unbounded
    pub fn or(self, fallback: u64) -> u64 {
        match self {
            Limit::Finite(value) => value,
            Limit::Unbounded => fallback,
        }
    }
}

/// Contents of `cpu.max`
///
/// - period: time slice in microseconds (usually 100000 = 100ms)
/// - quota: how many microseconds the cgroup may run per period
///
/// `"200000 100000"` = 2 CPUs, `"50000 100000"` = half a CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuMax {
    pub quota: Limit,
    pub period: u64,
}

/// CPU statistics from cpu.stat
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CpuStats {
    /// Total CPU time consumed (microseconds)
    pub usage_usec: u64,
}

/// Malformed accounting file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

fn parse_u64(token: &str, what: &str) -> Result<u64, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError(format!("invalid {}: {:?}", what, token)))
}

/// Parse a single-value limit file such as `memory.max`
pub fn parse_limit(raw: &str) -> Result<Limit, ParseError> {
    let value = raw.trim();
    if value == UNBOUNDED {
        return Ok(Limit::Unbounded);
    }
    parse_u64(value, "limit").map(Limit::Finite)
}

/// Parse a single integer counter file such as `memory.current`
pub fn parse_counter(raw: &str) -> Result<u64, ParseError> {
    parse_u64(raw.trim(), "counter")
}

/// Parse `cpu.max`, which must hold exactly two fields: `quota period`
pub fn parse_cpu_max(raw: &str) -> Result<CpuMax, ParseError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    let [quota, period] = fields.as_slice() else {
        return Err(ParseError(format!(
            "expected \"quota period\", got {} field(s): {:?}",
            fields.len(),
            raw.trim()
        )));
    };

    let quota = if *quota == UNBOUNDED {
        Limit::Unbounded
    } else {
        Limit::Finite(parse_u64(quota, "cpu quota")?)
    };

    let period = parse_u64(period, "cpu period")?;
    if period == 0 {
        return Err(ParseError("cpu period must be non-zero".to_string()));
    }

    Ok(CpuMax { quota, period })
}

/// Parse a flat-keyed file (`key value` per line) into a map
///
/// Lines that don't have exactly two fields are skipped.
pub fn parse_flat_keyed(raw: &str) -> HashMap<&str, &str> {
    raw.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Some((key, value)),
                _ => None,
            }
        })
        .collect()
}

/// Parse `cpu.stat`
///
/// Only `usage_usec` is read; it must be present and numeric.
pub fn parse_cpu_stat(raw: &str) -> Result<CpuStats, ParseError> {
    let usage = parse_flat_keyed(raw)
        .get("usage_usec")
        .copied()
        .ok_or_else(|| ParseError("missing usage_usec".to_string()))?;

    Ok(CpuStats {
        usage_usec: parse_u64(usage, "usage_usec")?,
    })
}
