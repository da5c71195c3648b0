//! Result logging and report aggregation
//!
//! Two levels:
//! 1. **Run-level**: one [`BenchmarkResult`] logged as it completes
//! 2. **Report-level**: a [`BenchmarkReport`] with speedups over the baseline,
//!    grouped the way the speedup plots consume them (parallelism on the
//!    x-axis, optimization as hue)
//!
//! ## Example
//!
//! ```rust
//! use ssr_kernels::{BenchConfig, BenchmarkHarness, BenchmarkReport, Kernel, Variant};
//!
//! let harness = BenchmarkHarness::new(BenchConfig::default()).unwrap();
//! let input: Vec<f64> = (0..32).map(|i| i as f64 * 0.1).collect();
//!
//! let mut report = BenchmarkReport::default();
//! for variant in [Variant::Baseline, Variant::Ssr] {
//!     report.push(harness.run(Kernel::Sin, variant, &input).unwrap());
//! }
//! let speedups = report.speedups();
//! assert_eq!(speedups.len(), 2);
//! ```

use crate::error::Result;
use crate::harness::BenchmarkResult;
use crate::variant::{Kernel, Optimization, Parallelism, Variant};
use serde::{Deserialize, Serialize};
use ssr_runtime::MemoryTier;
use std::collections::BTreeMap;

// ============================================================================
// Run-Level Logging
// ============================================================================

impl BenchmarkResult {
    /// Log the result line, `sin_ssr, size: 1024: 51234 cycles`
    pub fn log(&self) {
        tracing::info!(
            kernel = %self.kernel,
            variant = %self.variant,
            size = self.size,
            cycles = self.cycles,
            cycles_per_element = self.cycles_per_element(),
            cores = self.cores,
            tier = %self.input_tier,
            passed = self.passed,
            "{}, size: {}: {} cycles",
            self.name(),
            self.size,
            self.cycles
        );
        for violation in &self.violations {
            tracing::warn!(benchmark = %self.name(), %violation, "protocol violation recorded");
        }
    }
}

// ============================================================================
// Memory-Tier Comparison
// ============================================================================

/// Copy cycles with the source in main memory versus in L1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierComparison {
    pub size: usize,
    pub main_cycles: u64,
    pub l1_cycles: u64,
    /// Both copies reproduced the source exactly
    pub passed: bool,
}

impl TierComparison {
    /// How many times faster the L1 copy ran
    pub fn l1_speedup(&self) -> f64 {
        if self.l1_cycles == 0 {
            return 0.0;
        }
        self.main_cycles as f64 / self.l1_cycles as f64
    }

    pub fn log(&self) {
        tracing::info!(
            size = self.size,
            main_cycles = self.main_cycles,
            l1_cycles = self.l1_cycles,
            l1_speedup = self.l1_speedup(),
            passed = self.passed,
            "copy_{}_to_memory, size: {}: {} cycles; copy_{}_to_memory, size: {}: {} cycles",
            MemoryTier::Main,
            self.size,
            self.main_cycles,
            MemoryTier::L1,
            self.size,
            self.l1_cycles
        );
    }
}

// ============================================================================
// Report-Level Aggregation
// ============================================================================

/// Speedup of one run over the baseline of the same kernel and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speedup {
    pub kernel: Kernel,
    pub variant: Variant,
    pub size: usize,
    pub parallelism: Parallelism,
    pub optimization: Optimization,
    pub baseline_cycles: u64,
    pub cycles: u64,
    pub speedup: f64,
}

/// Everything a suite run produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub results: Vec<BenchmarkResult>,
    pub tier_comparisons: Vec<TierComparison>,
    /// Host time for the whole suite
    pub wall_ns: u64,
}

impl BenchmarkReport {
    pub fn push(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed) && self.tier_comparisons.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &BenchmarkResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Speedup of every run whose kernel and size also have a baseline run
    pub fn speedups(&self) -> Vec<Speedup> {
        let baselines: BTreeMap<(Kernel, usize), u64> = self
            .results
            .iter()
            .filter(|r| r.variant == Variant::Baseline)
            .map(|r| ((r.kernel, r.size), r.cycles))
            .collect();

        self.results
            .iter()
            .filter_map(|r| {
                let baseline_cycles = *baselines.get(&(r.kernel, r.size))?;
                Some(Speedup {
                    kernel: r.kernel,
                    variant: r.variant,
                    size: r.size,
                    parallelism: r.variant.parallelism(),
                    optimization: r.variant.optimization(),
                    baseline_cycles,
                    cycles: r.cycles,
                    speedup: if r.cycles == 0 {
                        0.0
                    } else {
                        baseline_cycles as f64 / r.cycles as f64
                    },
                })
            })
            .collect()
    }

    /// Mean speedup per (parallelism, optimization) cell
    pub fn speedup_grid(&self) -> BTreeMap<(Parallelism, Optimization), f64> {
        let mut cells: BTreeMap<(Parallelism, Optimization), (f64, usize)> = BTreeMap::new();
        for s in self.speedups() {
            let cell = cells.entry((s.parallelism, s.optimization)).or_default();
            cell.0 += s.speedup;
            cell.1 += 1;
        }
        cells
            .into_iter()
            .map(|(key, (sum, count))| (key, sum / count as f64))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Log a one-line summary and every failure
    pub fn log_summary(&self) {
        let failed = self.failures().count();
        tracing::info!(
            runs = self.results.len(),
            failed,
            tier_comparisons = self.tier_comparisons.len(),
            wall_ms = self.wall_ns as f64 / 1e6,
            "benchmark suite finished"
        );
        for result in self.failures() {
            tracing::warn!(
                benchmark = %result.name(),
                size = result.size,
                max_error = result.max_error,
                first_mismatch = result.first_mismatch,
                "verification failed"
            );
        }
    }
}
