//! End-to-end benchmark runs through the public facade

use ssr_bench::kernels::ops::{self, KernelArgs};
use ssr_bench::runtime::{
    call_across_boundary, Cluster, ClusterConfig, FpInstr, FpRegister, MemoryTier, ProtocolCheck, ProtocolViolation,
    StreamDescriptor,
};
use ssr_bench::{BenchConfig, BenchmarkHarness, BenchmarkSuite, Error, Kernel, Variant};
use ssr_kernels::math::Sinf;
use ssr_kernels::{plan, LookupTable};
use std::f64::consts::{FRAC_PI_2, PI};

#[test]
fn test_sin_quarter_points_all_single_core_variants() {
    let harness = BenchmarkHarness::new(BenchConfig::default()).unwrap();
    let input = [0.0, FRAC_PI_2, PI];

    for variant in [Variant::Baseline, Variant::Ssr, Variant::SsrFrep] {
        let result = harness.run(Kernel::Sin, variant, &input).unwrap();
        assert!(result.passed, "{}", result.name());
    }

    // absolute check of the baseline itself
    let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
    let data: Vec<f32> = input.iter().map(|&x| x as f32).collect();
    let input_addr = cluster.upload(MemoryTier::L1, &data).unwrap();
    let output = cluster.alloc::<f32>(MemoryTier::Main, 3).unwrap();
    ops::run_variant(&mut cluster, Kernel::Sin, Variant::Baseline, &KernelArgs::new(input_addr, output, 3)).unwrap();
    let result = cluster.download::<f32>(output, 3).unwrap();
    for (got, want) in result.iter().zip([0.0, 1.0, 0.0]) {
        assert!((*got as f64 - want).abs() < 1e-6);
    }
}

#[test]
fn test_baseline_is_idempotent() {
    let input: Vec<f32> = (0..100).map(|i| i as f32 * 0.07).collect();
    let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
    let input_addr = cluster.upload(MemoryTier::Main, &input).unwrap();
    let first = cluster.alloc::<f32>(MemoryTier::Main, input.len()).unwrap();
    let second = cluster.alloc::<f32>(MemoryTier::Main, input.len()).unwrap();

    for output in [first, second] {
        let args = KernelArgs::new(input_addr, output, input.len());
        ops::run_variant(&mut cluster, Kernel::Sin, Variant::Baseline, &args).unwrap();
    }

    let a = cluster.download::<f32>(first, input.len()).unwrap();
    let b = cluster.download::<f32>(second, input.len()).unwrap();
    assert!(a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits()));
}

#[test]
fn test_lookup_quarter_period_resolves_to_256() {
    let table = LookupTable::new(1024).unwrap();
    assert_eq!(table.index_of(FRAC_PI_2).unwrap(), 256);

    let harness = BenchmarkHarness::new(BenchConfig::default()).unwrap();
    for variant in [Variant::LookupTable, Variant::SsrLookupTable] {
        let result = harness.run(Kernel::Sin, variant, &[FRAC_PI_2]).unwrap();
        assert!(result.passed);
        assert!(result.max_error <= table.resolution());
    }
}

#[test]
fn test_partition_eight_over_three() {
    let plan = plan(8, 3).unwrap();
    let owned: Vec<Vec<usize>> = plan.ranges().map(|r| r.indices().collect()).collect();
    assert_eq!(owned, vec![vec![0, 1, 6], vec![2, 3, 7], vec![4, 5]]);
}

#[test]
fn test_short_stream_loop_is_flagged() {
    let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
    let input = cluster.upload(MemoryTier::L1, &[0.5f32; 8]).unwrap();
    let output = cluster.alloc::<f32>(MemoryTier::Main, 8).unwrap();
    let read = StreamDescriptor::contiguous::<f32>(8).read(input);
    let write = StreamDescriptor::contiguous::<f32>(8).write(output);

    let err = cluster
        .run_single(|core| {
            core.with_session(Some(read), Some(write), |s| {
                s.stream_loop(7, |s| {
                    s.exec(FpInstr::Fmv {
                        dst: FpRegister::FA0,
                        src: FpRegister::FT0,
                    })?;
                    call_across_boundary(s, &Sinf)?;
                    s.exec(FpInstr::Fmv {
                        dst: FpRegister::FT1,
                        src: FpRegister::FA0,
                    })
                })
            })
        })
        .unwrap_err();

    assert!(matches!(
        err.violation(),
        Some(ProtocolViolation::UnconsumedPattern { remaining: 1, .. })
    ));
}

#[test]
fn test_strict_mode_rejects_call_while_enabled() {
    let mut cluster = Cluster::new(ClusterConfig::default().with_protocol_check(ProtocolCheck::Strict)).unwrap();
    let input = cluster.upload(MemoryTier::L1, &[0.5f32; 2]).unwrap();
    let output = cluster.alloc::<f32>(MemoryTier::Main, 2).unwrap();
    let read = StreamDescriptor::contiguous::<f32>(2).read(input);
    let write = StreamDescriptor::contiguous::<f32>(2).write(output);

    let err = cluster
        .run_single(|core| {
            core.with_session(Some(read), Some(write), |s| {
                s.stream_loop(2, |s| {
                    s.exec(FpInstr::Fmv {
                        dst: FpRegister::FA0,
                        src: FpRegister::FT0,
                    })?;
                    s.call_foreign(&Sinf)?;
                    s.exec(FpInstr::Fmv {
                        dst: FpRegister::FT1,
                        src: FpRegister::FA0,
                    })
                })
            })
        })
        .unwrap_err();

    assert!(matches!(
        err.violation(),
        Some(ProtocolViolation::ForeignCallWhileEnabled { routine: "sinf" })
    ));
}

#[test]
fn test_suite_report_round_trips() {
    let config = BenchConfig {
        sizes: vec![5, 17],
        kernels: vec![Kernel::Sin, Kernel::Copy],
        ..BenchConfig::default()
    };
    let report = BenchmarkSuite::new(config).unwrap().run().unwrap();

    // 9 sin + 3 copy per size
    assert_eq!(report.results.len(), 24);
    assert_eq!(report.tier_comparisons.len(), 2);
    assert!(report.all_passed());
    assert!(report.tier_comparisons.iter().all(|c| c.l1_cycles < c.main_cycles));

    let speedups = report.speedups();
    assert_eq!(speedups.len(), report.results.len());

    let dir = std::env::temp_dir().join(format!("ssr-bench-report-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("report.json");
    ssr_bench::write_report(&report, &path).unwrap();
    let parsed = ssr_bench::BenchmarkReport::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed.results.len(), report.results.len());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_unsupported_variant_surfaces_as_error() {
    let harness = BenchmarkHarness::new(BenchConfig::default()).unwrap();
    let err = harness.run(Kernel::Copy, Variant::SsrOmp, &[1.0]).unwrap_err();
    assert_eq!(err.to_string(), "Unsupported variant: copy has no ssr_omp variant");
    assert!(matches!(err, Error::UnsupportedVariant { .. }));
}

#[test]
#[serial_test::serial]
fn test_run_from_env_uses_overrides() {
    std::env::set_var("SSR_BENCH_SIZES", "6");
    std::env::set_var("SSR_BENCH_CORES", "4");
    let report = ssr_bench::run_from_env();
    std::env::remove_var("SSR_BENCH_SIZES");
    std::env::remove_var("SSR_BENCH_CORES");

    let report = report.unwrap();
    assert!(report.all_passed());
    assert!(report.results.iter().all(|r| r.size == 6));
    assert!(report
        .results
        .iter()
        .filter(|r| r.variant.is_parallel())
        .all(|r| r.cores == 3));
}
