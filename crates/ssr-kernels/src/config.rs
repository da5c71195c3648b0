//! Benchmark configuration
//!
//! A [`BenchConfig`] is loaded from JSON or built from defaults, then
//! optionally overridden from the environment.
//!
//! # Environment Variables
//!
//! - `SSR_BENCH_SIZES` - comma-separated input sizes, e.g. `64,256,1024`
//! - `SSR_BENCH_CORES` - total cores including the data-mover core
//! - `SSR_BENCH_TIER` - input memory tier: `main` or `l1`
//! - `SSR_BENCH_LUT_SIZE` - lookup table entries
//! - `SSR_BENCH_CHECK` - protocol checking: `strict` or `permissive`
//! - `SSR_BENCH_DEADLINE_MS` - wall-clock deadline per run, `0` disables it

use crate::error::{Error, Result};
use crate::lookup::DEFAULT_TABLE_SIZE;
use crate::variant::{Kernel, Variant};
use serde::{Deserialize, Serialize};
use ssr_runtime::{ClusterConfig, MemoryTier, ProtocolCheck};
use std::env;
use std::time::Duration;

/// Default relative tolerance for transcendental kernels
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-6;

/// What to run and on which cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Input sizes, each run as its own benchmark
    pub sizes: Vec<usize>,
    pub kernels: Vec<Kernel>,
    /// Variants to try; ones a kernel does not define are skipped
    pub variants: Vec<Variant>,
    /// Lookup table entries
    pub lut_size: usize,
    /// Tier the input vector is uploaded to
    pub input_tier: MemoryTier,
    /// Relative tolerance for `sin` and `sigmoid` outputs
    pub relative_tolerance: f64,
    /// Wall-clock budget per run, checked after the run completes
    pub deadline_ms: Option<u64>,
    pub cluster: ClusterConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sizes: vec![64, 256, 1024],
            kernels: Kernel::ALL.to_vec(),
            variants: Variant::ALL.to_vec(),
            lut_size: DEFAULT_TABLE_SIZE,
            input_tier: MemoryTier::L1,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            deadline_ms: None,
            cluster: ClusterConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Parse a (possibly partial) JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `SSR_BENCH_*` overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(sizes) = env::var("SSR_BENCH_SIZES") {
            self.sizes = sizes
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_var("SSR_BENCH_SIZES", s))
                .collect::<Result<_>>()?;
        }

        if let Ok(cores) = env::var("SSR_BENCH_CORES") {
            self.cluster.total_cores = parse_var("SSR_BENCH_CORES", &cores)?;
        }

        if let Ok(tier) = env::var("SSR_BENCH_TIER") {
            self.input_tier = match tier.trim().to_ascii_lowercase().as_str() {
                "main" => MemoryTier::Main,
                "l1" => MemoryTier::L1,
                other => return Err(Error::invalid_config(format!("SSR_BENCH_TIER: unknown tier '{other}'"))),
            };
        }

        if let Ok(size) = env::var("SSR_BENCH_LUT_SIZE") {
            self.lut_size = parse_var("SSR_BENCH_LUT_SIZE", &size)?;
        }

        if let Ok(check) = env::var("SSR_BENCH_CHECK") {
            self.cluster.protocol_check = match check.trim().to_ascii_lowercase().as_str() {
                "strict" => ProtocolCheck::Strict,
                "permissive" => ProtocolCheck::Permissive,
                other => {
                    return Err(Error::invalid_config(format!(
                        "SSR_BENCH_CHECK: expected strict or permissive, got '{other}'"
                    )))
                }
            };
        }

        if let Ok(deadline) = env::var("SSR_BENCH_DEADLINE_MS") {
            let ms: u64 = parse_var("SSR_BENCH_DEADLINE_MS", &deadline)?;
            self.deadline_ms = (ms > 0).then_some(ms);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(Error::invalid_config("at least one input size is required"));
        }
        if self.lut_size == 0 {
            return Err(Error::InvalidTableSize(0));
        }
        if !(self.relative_tolerance.is_finite() && self.relative_tolerance >= 0.0) {
            return Err(Error::invalid_config(format!(
                "relative tolerance must be finite and non-negative, got {}",
                self.relative_tolerance
            )));
        }
        self.cluster.validate()?;
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_config(format!("{name}: cannot parse '{value}'")))
}
