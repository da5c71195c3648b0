//! Cycle benchmark harness
//!
//! [`BenchmarkHarness::run`] stages the input on a fresh cluster, runs the
//! kernel's baseline to get the reference output, then reads the cluster
//! cycle counter immediately before and after the variant under test. The
//! output is checked against the reference with a per-kernel tolerance.
//!
//! The harness plays the coordinator: it is the only place that logs
//! results, after the region has joined.

use crate::config::BenchConfig;
use crate::error::Result;
use crate::lookup::LookupTable;
use crate::ops::{run_variant, KernelArgs};
use crate::variant::{Kernel, Parallelism, RepeatFolding, Variant};
use serde::{Deserialize, Serialize};
use ssr_runtime::{Cluster, CycleSource, Element, FloatType, MemoryTier, ProtocolViolation};
use ssr_tracing::performance::{record_cycles, PerformanceSpan};
use std::time::Duration;
use tracing::{debug, warn};

/// Allowed difference between a variant's output and the reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bound", rename_all = "snake_case")]
pub enum Tolerance {
    /// Bit-identical values
    Exact,
    /// `|got - want| <= bound * max(|want|, 1)`: absolute for outputs below
    /// one in magnitude, relative above
    Mixed(f64),
    /// `|got - want| <= bound`
    Absolute(f64),
}

impl Tolerance {
    pub fn accepts(&self, got: f64, want: f64) -> bool {
        match *self {
            Tolerance::Exact => got.to_bits() == want.to_bits(),
            Tolerance::Mixed(bound) => (got - want).abs() <= bound * want.abs().max(1.0),
            Tolerance::Absolute(bound) => (got - want).abs() <= bound,
        }
    }

    /// Tolerance used for `variant` of `kernel`
    ///
    /// Lookup-table variants are held to the table's sample spacing with
    /// half a spacing of slack for the `f32` index computation.
    pub fn for_run(kernel: Kernel, variant: Variant, config: &BenchConfig) -> Self {
        match kernel {
            Kernel::Copy => Tolerance::Exact,
            _ if variant.uses_lookup_table() => {
                Tolerance::Absolute(1.5 * std::f64::consts::TAU / config.lut_size as f64)
            }
            _ => Tolerance::Mixed(config.relative_tolerance),
        }
    }
}

/// Element-wise comparison result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub passed: bool,
    /// Largest absolute difference seen, infinite when an output is NaN
    #[serde(with = "unbounded_error")]
    pub max_error: f64,
    pub first_mismatch: Option<usize>,
}

/// Compare `got` against `want`
///
/// A length difference fails at the first index past the shorter vector.
pub fn verify_vector(got: &[f64], want: &[f64], tolerance: Tolerance) -> Verification {
    let mut max_error: f64 = 0.0;
    let mut first_mismatch = None;

    for (i, (&g, &w)) in got.iter().zip(want).enumerate() {
        let error = (g - w).abs();
        if error.is_nan() || error > max_error {
            max_error = if error.is_nan() { f64::INFINITY } else { error };
        }
        if first_mismatch.is_none() && !tolerance.accepts(g, w) {
            first_mismatch = Some(i);
        }
    }
    if first_mismatch.is_none() && got.len() != want.len() {
        first_mismatch = Some(got.len().min(want.len()));
    }

    Verification {
        passed: first_mismatch.is_none(),
        max_error,
        first_mismatch,
    }
}

/// Outcome of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub kernel: Kernel,
    pub variant: Variant,
    /// Input size `n`
    pub size: usize,
    /// Cluster cycles spent in the variant
    pub cycles: u64,
    /// Output matched the baseline within tolerance
    pub passed: bool,
    pub parallelism: Parallelism,
    /// Compute cores the variant ran on
    pub cores: usize,
    pub input_tier: MemoryTier,
    pub tolerance: Tolerance,
    #[serde(with = "unbounded_error")]
    pub max_error: f64,
    pub first_mismatch: Option<usize>,
    pub folding: RepeatFolding,
    /// `mcycle` of each core at the end of the region
    pub per_core_cycles: Vec<u64>,
    /// Violations recorded in permissive mode
    pub violations: Vec<String>,
    /// Host time for the whole run, staging and verification included
    pub wall_ns: u64,
    pub deadline_exceeded: bool,
}

impl BenchmarkResult {
    /// `<kernel>_<variant>`
    pub fn name(&self) -> String {
        format!("{}_{}", self.kernel, self.variant)
    }

    pub fn cycles_per_element(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            self.cycles as f64 / self.size as f64
        }
    }
}

/// Runs single benchmarks against a [`BenchConfig`]
#[derive(Debug, Clone)]
pub struct BenchmarkHarness {
    config: BenchConfig,
}

impl BenchmarkHarness {
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Run `variant` of `kernel` on `input` and verify it against the baseline
    ///
    /// Inputs are converted to the kernel's element type before staging.
    #[tracing::instrument(skip_all, fields(kernel = %kernel, variant = %variant, n = input.len()))]
    pub fn run(&self, kernel: Kernel, variant: Variant, input: &[f64]) -> Result<BenchmarkResult> {
        self.run_on_tier(kernel, variant, input, self.config.input_tier)
    }

    /// Like [`run`](Self::run) with the input placed on `tier`
    pub fn run_on_tier(&self, kernel: Kernel, variant: Variant, input: &[f64], tier: MemoryTier) -> Result<BenchmarkResult> {
        kernel.ensure_supported(variant)?;
        match kernel.element_type() {
            FloatType::F32 => self.run_typed::<f32>(kernel, variant, input, tier),
            FloatType::F64 => self.run_typed::<f64>(kernel, variant, input, tier),
        }
    }

    fn run_typed<T: Element>(&self, kernel: Kernel, variant: Variant, input: &[f64], tier: MemoryTier) -> Result<BenchmarkResult> {
        let span = PerformanceSpan::new(format!("{kernel}_{variant}"), None);
        let n = input.len();
        let mut cluster = Cluster::new(self.config.cluster.clone())?;

        let data: Vec<T> = input.iter().map(|&x| T::from_f64(x)).collect();
        let input_addr = cluster.upload(tier, &data)?;
        let output = cluster.alloc::<T>(MemoryTier::Main, n)?;
        let reference = cluster.alloc::<T>(MemoryTier::Main, n)?;

        let mut args = KernelArgs::new(input_addr, output, n);
        if variant.uses_lookup_table() {
            let table = LookupTable::new(self.config.lut_size)?;
            args = args.with_table(table.upload(&cluster, MemoryTier::L1)?);
        }

        let reference_args = KernelArgs::new(input_addr, reference, n);
        run_variant(&mut cluster, kernel, Variant::Baseline, &reference_args)?;

        let start = cluster.read();
        let run = run_variant(&mut cluster, kernel, variant, &args)?;
        let end = cluster.read();
        let cycles = end - start;
        debug_assert_eq!(cycles, run.elapsed);

        let got = to_f64(cluster.download::<T>(output, n)?);
        let want = to_f64(cluster.download::<T>(reference, n)?);
        let tolerance = Tolerance::for_run(kernel, variant, &self.config);
        let verification = verify_vector(&got, &want, tolerance);

        let wall_ns = span.elapsed_ns();
        let deadline_exceeded = self
            .config
            .deadline()
            .is_some_and(|deadline| Duration::from_nanos(wall_ns) > deadline);

        let result = BenchmarkResult {
            kernel,
            variant,
            size: n,
            cycles,
            passed: verification.passed,
            parallelism: variant.parallelism(),
            cores: run.per_core_cycles.len(),
            input_tier: tier,
            tolerance,
            max_error: verification.max_error,
            first_mismatch: verification.first_mismatch,
            folding: run.folding,
            per_core_cycles: run.per_core_cycles,
            violations: run.violations.iter().map(ProtocolViolation::to_string).collect(),
            wall_ns,
            deadline_exceeded,
        };

        if deadline_exceeded {
            warn!(
                benchmark = %result.name(),
                wall_ns,
                deadline_ms = self.config.deadline_ms,
                "benchmark exceeded its deadline"
            );
        }
        if !result.passed {
            warn!(
                benchmark = %result.name(),
                size = n,
                max_error = result.max_error,
                first_mismatch = result.first_mismatch,
                "output differs from baseline"
            );
        }
        record_cycles(kernel.name(), variant.name(), n, cycles);
        debug!(benchmark = %result.name(), size = n, cycles, "benchmark finished");

        Ok(result)
    }
}

fn to_f64<T: Element>(values: Vec<T>) -> Vec<f64> {
    values.into_iter().map(Element::to_f64).collect()
}

/// JSON has no infinity; a non-finite error is written as `null`
mod unbounded_error {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(error: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if error.is_finite() {
            serializer.serialize_f64(*error)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn harness() -> BenchmarkHarness {
        BenchmarkHarness::new(BenchConfig::default()).unwrap()
    }

    #[test]
    fn test_tolerance_rules() {
        assert!(Tolerance::Exact.accepts(1.5, 1.5));
        assert!(!Tolerance::Exact.accepts(0.0, -0.0));
        assert!(Tolerance::Mixed(1e-6).accepts(1e6 + 0.5, 1e6));
        assert!(!Tolerance::Mixed(1e-6).accepts(1e6 + 2.0, 1e6));
        assert!(Tolerance::Mixed(1e-6).accepts(5e-7, 0.0));
        // below one the bound is absolute
        assert!(Tolerance::Mixed(1e-6).accepts(2e-12, 1e-12));
        assert!(Tolerance::Absolute(0.1).accepts(0.95, 1.0));
        assert!(!Tolerance::Absolute(0.1).accepts(f64::NAN, 1.0));
    }

    #[test]
    fn test_verify_vector_reports_first_mismatch() {
        let v = verify_vector(&[1.0, 2.0, 3.5, 4.5], &[1.0, 2.0, 3.0, 4.0], Tolerance::Absolute(0.25));
        assert!(!v.passed);
        assert_eq!(v.first_mismatch, Some(2));
        assert_eq!(v.max_error, 0.5);

        let short = verify_vector(&[1.0], &[1.0, 2.0], Tolerance::Exact);
        assert_eq!(short.first_mismatch, Some(1));
    }

    #[test]
    fn test_sin_quarter_points() {
        let result = harness().run(Kernel::Sin, Variant::Ssr, &[0.0, FRAC_PI_2, PI]).unwrap();
        assert!(result.passed);
        assert_eq!(result.size, 3);
        assert!(result.cycles > 0);
        assert_eq!(result.cores, 1);
        assert_eq!(result.name(), "sin_ssr");
    }

    #[test]
    fn test_omp_records_fork_cost_and_cores() {
        let input: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let result = harness().run(Kernel::Sin, Variant::Omp, &input).unwrap();
        assert!(result.passed);
        assert_eq!(result.cores, 8);
        assert_eq!(result.parallelism, Parallelism::ForkJoin);
        let slowest = result.per_core_cycles.iter().copied().max().unwrap();
        let cost = BenchConfig::default().cluster.cost;
        assert_eq!(result.cycles, cost.fork + slowest + cost.barrier);
    }

    #[test]
    fn test_unsupported_pair_is_an_error() {
        let err = harness().run(Kernel::Sigmoid, Variant::LookupTable, &[0.0]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVariant { .. }));
    }

    #[test]
    fn test_lookup_outside_period_is_an_error() {
        let err = harness()
            .run(Kernel::Sin, Variant::LookupTable, &[0.5, -1.0])
            .unwrap_err();
        assert!(matches!(err, Error::LookupOutOfRange { .. }));
    }

    #[test]
    fn test_zero_deadline_is_exceeded() {
        let config = BenchConfig {
            deadline_ms: Some(0),
            ..BenchConfig::default()
        };
        let harness = BenchmarkHarness::new(config).unwrap();
        let input: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let result = harness.run(Kernel::Copy, Variant::Baseline, &input).unwrap();
        assert!(result.passed);
        assert!(result.deadline_exceeded);
    }
}
