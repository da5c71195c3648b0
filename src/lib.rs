//! # ssr-bench
//!
//! Benchmarks of element-wise math kernels that use the Snitch stream
//! semantic registers (SSR), run on a cycle-level cluster simulator.
//!
//! - [`runtime`] - the simulated cluster: memory tiers, stream sessions,
//!   foreign calls, FREP and execution regions
//! - [`kernels`] - kernel variants, work partitioning and the harness
//! - [`tracing_setup`] - subscriber configuration
//!
//! [`run_from_env`] is the whole benchmark driver: it installs tracing,
//! loads [`BenchConfig`] from `SSR_BENCH_*` and runs the suite.

pub use ssr_kernels as kernels;
pub use ssr_runtime as runtime;
pub use ssr_tracing as tracing_setup;

pub use ssr_kernels::{
    BenchConfig, BenchmarkHarness, BenchmarkReport, BenchmarkResult, BenchmarkSuite, Error, Kernel, Result, Variant,
};

/// Install tracing from `SSR_TRACING_*`, then run the suite configured by
/// `SSR_BENCH_*`
///
/// A subscriber that is already installed is kept.
pub fn run_from_env() -> Result<BenchmarkReport> {
    let tracing_config = ssr_tracing::TracingConfig::from_env();
    if let Err(err) = ssr_tracing::init_global_tracing(&tracing_config) {
        tracing::debug!(error = %err, "keeping existing tracing subscriber");
    }

    let config = BenchConfig::from_env()?;
    tracing::info!(
        sizes = ?config.sizes,
        cores = config.cluster.total_cores,
        tier = %config.input_tier,
        "starting benchmark suite"
    );
    BenchmarkSuite::new(config)?.run()
}

/// Write `report` as pretty JSON, the input of the speedup plots
pub fn write_report(report: &BenchmarkReport, path: impl AsRef<std::path::Path>) -> Result<()> {
    std::fs::write(path, report.to_json()?)?;
    Ok(())
}
