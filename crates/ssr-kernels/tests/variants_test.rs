//! Differential tests: every variant against its kernel's baseline

use proptest::prelude::*;
use ssr_kernels::{BenchConfig, BenchmarkHarness, Error, Kernel, RepeatFolding, Variant};
use ssr_runtime::{MemoryTier, ProtocolCheck};
use std::f64::consts::TAU;

fn harness_with_cores(total_cores: usize) -> BenchmarkHarness {
    let mut config = BenchConfig::default();
    config.cluster = config.cluster.with_total_cores(total_cores);
    BenchmarkHarness::new(config).unwrap()
}

fn check_all_variants(harness: &BenchmarkHarness, kernel: Kernel, input: &[f64]) -> Result<(), TestCaseError> {
    for &variant in kernel.variants() {
        let result = harness.run(kernel, variant, input).unwrap();
        prop_assert!(
            result.passed,
            "{} n={} max_error={} first_mismatch={:?}",
            result.name(),
            input.len(),
            result.max_error,
            result.first_mismatch
        );
        prop_assert!(result.violations.is_empty());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_sin_variants_agree(
        input in prop::collection::vec(0.0f64..TAU * 0.999, 0..48),
        cores in 2usize..10,
    ) {
        check_all_variants(&harness_with_cores(cores), Kernel::Sin, &input)?;
    }

    #[test]
    fn prop_sigmoid_variants_agree(
        input in prop::collection::vec(-30.0f64..30.0, 0..48),
        cores in 2usize..10,
    ) {
        check_all_variants(&harness_with_cores(cores), Kernel::Sigmoid, &input)?;
    }

    #[test]
    fn prop_copy_variants_agree(input in prop::collection::vec(-1.0e6f64..1.0e6, 0..64)) {
        check_all_variants(&harness_with_cores(9), Kernel::Copy, &input)?;
    }
}

#[test]
fn fewer_elements_than_cores() {
    let harness = harness_with_cores(9);
    let input = [0.1, 0.2, 0.3];
    for variant in [Variant::Parallel, Variant::SsrParallel, Variant::Omp, Variant::SsrOmp] {
        let result = harness.run(Kernel::Sin, variant, &input).unwrap();
        assert!(result.passed, "{}", result.name());
        assert_eq!(result.per_core_cycles.len(), 8);
    }
}

#[test]
fn frep_outcomes() {
    let harness = harness_with_cores(9);
    let input: Vec<f64> = (0..16).map(|i| i as f64 * 0.25).collect();

    let copy = harness.run(Kernel::Copy, Variant::SsrFrep, &input).unwrap();
    assert_eq!(copy.folding, RepeatFolding::Folded { iterations: 16 });

    for kernel in [Kernel::Sin, Kernel::Sigmoid] {
        let result = harness.run(kernel, Variant::SsrFrep, &input).unwrap();
        assert!(result.passed);
        assert!(matches!(result.folding, RepeatFolding::NotApplicable { .. }));
    }
}

#[test]
fn streaming_beats_baseline_on_copy() {
    let harness = harness_with_cores(9);
    let input: Vec<f64> = (0..256).map(|i| i as f64).collect();
    let baseline = harness.run(Kernel::Copy, Variant::Baseline, &input).unwrap();
    let ssr = harness.run(Kernel::Copy, Variant::Ssr, &input).unwrap();
    let frep = harness.run(Kernel::Copy, Variant::SsrFrep, &input).unwrap();
    assert!(ssr.cycles < baseline.cycles);
    assert!(frep.cycles < ssr.cycles);
}

#[test]
fn parallel_beats_single_core_on_sin() {
    let harness = harness_with_cores(9);
    let input: Vec<f64> = (0..512).map(|i| i as f64 * TAU / 512.0).collect();
    let single = harness.run(Kernel::Sin, Variant::Ssr, &input).unwrap();
    let spmd = harness.run(Kernel::Sin, Variant::SsrParallel, &input).unwrap();
    let forked = harness.run(Kernel::Sin, Variant::SsrOmp, &input).unwrap();
    assert!(spmd.cycles < single.cycles);
    assert!(spmd.cycles < forked.cycles);
}

#[test]
fn main_memory_input_is_slower() {
    let harness = harness_with_cores(9);
    let input: Vec<f64> = (0..128).map(|i| i as f64 * 0.01).collect();
    let l1 = harness.run_on_tier(Kernel::Sin, Variant::Ssr, &input, MemoryTier::L1).unwrap();
    let main = harness.run_on_tier(Kernel::Sin, Variant::Ssr, &input, MemoryTier::Main).unwrap();
    assert!(l1.passed && main.passed);
    assert!(l1.cycles < main.cycles);
}

#[test]
fn l1_overflow_is_reported() {
    let mut config = BenchConfig::default();
    config.cluster.l1_capacity_bytes = 64;
    let harness = BenchmarkHarness::new(config).unwrap();
    let err = harness.run(Kernel::Sigmoid, Variant::Baseline, &[0.0; 16]).unwrap_err();
    assert!(matches!(err, Error::Runtime(ssr_runtime::RuntimeError::OutOfMemory { .. })));
}

#[test]
fn permissive_mode_still_verifies() {
    let mut config = BenchConfig::default();
    config.cluster.protocol_check = ProtocolCheck::Permissive;
    let harness = BenchmarkHarness::new(config).unwrap();
    let input: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
    let result = harness.run(Kernel::Sigmoid, Variant::SsrParallel, &input).unwrap();
    assert!(result.passed);
    assert!(result.violations.is_empty());
}
