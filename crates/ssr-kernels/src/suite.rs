//! Benchmark matrix runner
//!
//! Runs every configured kernel × variant × size on deterministic inputs,
//! plus the main-versus-L1 copy comparison, and collects a
//! [`BenchmarkReport`].

use crate::config::BenchConfig;
use crate::error::Result;
use crate::harness::BenchmarkHarness;
use crate::instrumentation::{BenchmarkReport, TierComparison};
use crate::variant::{Kernel, Variant};
use ssr_runtime::{CycleSource, HostClock, MemoryTier};
use ssr_tracing::performance::record_throughput;
use ssr_tracing::timed_block;
use std::f64::consts::TAU;
use tracing::{debug, info_span};

/// Deterministic input of `n` elements for `kernel`
///
/// - sin: one period, `i * 2π / n`, so every input is in lookup-table range
/// - sigmoid: evenly spread over `[-8, 8)`
/// - copy: `i - 20`
pub fn kernel_input(kernel: Kernel, n: usize) -> Vec<f64> {
    match kernel {
        Kernel::Sin => (0..n).map(|i| i as f64 * TAU / n as f64).collect(),
        Kernel::Sigmoid => (0..n).map(|i| -8.0 + 16.0 * i as f64 / n as f64).collect(),
        Kernel::Copy => (0..n).map(|i| i as f64 - 20.0).collect(),
    }
}

/// Runs a [`BenchConfig`] end to end
#[derive(Debug, Clone)]
pub struct BenchmarkSuite {
    harness: BenchmarkHarness,
}

impl BenchmarkSuite {
    pub fn new(config: BenchConfig) -> Result<Self> {
        Ok(Self {
            harness: BenchmarkHarness::new(config)?,
        })
    }

    pub fn harness(&self) -> &BenchmarkHarness {
        &self.harness
    }

    /// Pairs the configuration selects, skipping undefined ones
    pub fn matrix(&self) -> Vec<(Kernel, Variant)> {
        let config = self.harness.config();
        config
            .kernels
            .iter()
            .flat_map(|&kernel| {
                config
                    .variants
                    .iter()
                    .copied()
                    .filter(move |&variant| kernel.supports(variant))
                    .map(move |variant| (kernel, variant))
            })
            .collect()
    }

    /// Run the whole matrix, then the tier comparison when copy is selected
    pub fn run(&self) -> Result<BenchmarkReport> {
        let clock = HostClock::new();
        let mut report = BenchmarkReport::default();
        let config = self.harness.config();

        let matrix = self.matrix();

        for &size in &config.sizes {
            let _span = info_span!("size", n = size).entered();
            let ((), duration_us) = timed_block!("benchmark_size", {
                for &(kernel, variant) in &matrix {
                    let input = kernel_input(kernel, size);
                    let result = self.harness.run(kernel, variant, &input)?;
                    result.log();
                    report.push(result);
                }
            });
            record_throughput("benchmark_size", size * matrix.len(), duration_us);

            if config.kernels.contains(&Kernel::Copy) {
                let comparison = self.compare_tiers(size)?;
                comparison.log();
                report.tier_comparisons.push(comparison);
            }
        }

        report.wall_ns = clock.read();
        report.log_summary();
        Ok(report)
    }

    /// Scalar copy of `n` elements with the source in main memory, then in L1
    pub fn compare_tiers(&self, n: usize) -> Result<TierComparison> {
        let input = kernel_input(Kernel::Copy, n);
        let main = self
            .harness
            .run_on_tier(Kernel::Copy, Variant::Baseline, &input, MemoryTier::Main)?;
        let l1 = self
            .harness
            .run_on_tier(Kernel::Copy, Variant::Baseline, &input, MemoryTier::L1)?;
        debug!(n, main = main.cycles, l1 = l1.cycles, "tier comparison");

        Ok(TierComparison {
            size: n,
            main_cycles: main.cycles,
            l1_cycles: l1.cycles,
            passed: main.passed && l1.passed,
        })
    }
}
