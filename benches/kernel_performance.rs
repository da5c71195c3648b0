//! Host-side cost of simulating each kernel variant
//!
//! The simulated cycle counts come from the suite itself; this measures how
//! long the simulator takes to produce them:
//! - Every variant of sin, sigmoid and copy at three sizes
//! - Stream session setup and teardown alone
//! - The main-versus-L1 tier comparison

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ssr_bench::runtime::{Cluster, ClusterConfig, FpInstr, FpRegister, MemoryTier, StreamDescriptor};
use ssr_bench::{kernels::kernel_input, BenchConfig, BenchmarkHarness, BenchmarkSuite, Kernel};

const SIZES: [usize; 3] = [64, 256, 1024];

fn benchmark_kernel(c: &mut Criterion, kernel: Kernel) {
    let harness = BenchmarkHarness::new(BenchConfig::default()).unwrap();
    let mut group = c.benchmark_group(kernel.name());

    for size in SIZES {
        let input = kernel_input(kernel, size);
        for &variant in kernel.variants() {
            group.bench_with_input(BenchmarkId::new(variant.name(), size), &input, |b, input| {
                b.iter(|| black_box(harness.run(kernel, variant, input).unwrap()));
            });
        }
    }

    group.finish();
}

fn benchmark_sin(c: &mut Criterion) {
    benchmark_kernel(c, Kernel::Sin);
}

fn benchmark_sigmoid(c: &mut Criterion) {
    benchmark_kernel(c, Kernel::Sigmoid);
}

fn benchmark_copy(c: &mut Criterion) {
    benchmark_kernel(c, Kernel::Copy);
}

fn benchmark_stream_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_session");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("pass_through", size), &size, |b, &n| {
            let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
            let data: Vec<f32> = (0..n).map(|i| i as f32).collect();
            let input = cluster.upload(MemoryTier::L1, &data).unwrap();
            let output = cluster.alloc::<f32>(MemoryTier::L1, n).unwrap();
            let read = StreamDescriptor::contiguous::<f32>(n).read(input);
            let write = StreamDescriptor::contiguous::<f32>(n).write(output);

            b.iter(|| {
                let report = cluster
                    .run_single(|core| {
                        core.with_session(Some(read), Some(write), |s| {
                            s.stream_loop(n, |s| {
                                s.exec(FpInstr::Fmv {
                                    dst: FpRegister::FT1,
                                    src: FpRegister::FT0,
                                })
                            })
                        })
                    })
                    .unwrap();
                black_box(report.elapsed);
            });
        });
    }

    group.finish();
}

fn benchmark_tier_comparison(c: &mut Criterion) {
    let suite = BenchmarkSuite::new(BenchConfig::default()).unwrap();
    let mut group = c.benchmark_group("tier_comparison");

    for size in SIZES {
        group.bench_with_input(BenchmarkId::new("copy", size), &size, |b, &n| {
            b.iter(|| black_box(suite.compare_tiers(n).unwrap()));
        });
    }

    group.finish();
}

fn custom_criterion() -> Criterion {
    Criterion::default()
        .measurement_time(std::time::Duration::from_secs(5))
        .warm_up_time(std::time::Duration::from_secs(1))
        .sample_size(30) // the 1024-element omp runs are slow to simulate
}

criterion_group!(
    name = benches;
    config = custom_criterion();
    targets =
        benchmark_sin,
        benchmark_sigmoid,
        benchmark_copy,
        benchmark_stream_session,
        benchmark_tier_comparison
);
criterion_main!(benches);
