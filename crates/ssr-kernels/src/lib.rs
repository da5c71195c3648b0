//! # ssr-kernels - Streaming-Register Math Kernels
//!
//! Element-wise `sin`, `sigmoid` and `copy` kernels for the simulated cluster
//! in [`ssr_runtime`], in every variant the benchmarks compare, plus the
//! harness that times and verifies them.
//!
//! ## Variants
//!
//! | Variant | sin | sigmoid | copy |
//! |---|---|---|---|
//! | `baseline` | ✔ | ✔ | ✔ |
//! | `ssr` | ✔ | ✔ | ✔ |
//! | `ssr_frep` | not applicable | not applicable | folded |
//! | `lookup_table` | ✔ | | |
//! | `ssr_lookup_table` | ✔ | | |
//! | `parallel` | ✔ | ✔ | |
//! | `ssr_parallel` | ✔ | ✔ | |
//! | `omp` | ✔ | | |
//! | `ssr_omp` | ✔ | ✔ | |
//!
//! Parallel variants split the input with [`partition::plan`] over the
//! compute cores; the data-mover core never takes part.
//!
//! ## Example
//!
//! ```rust
//! use ssr_kernels::{BenchConfig, BenchmarkHarness, Kernel, Variant};
//! use std::f64::consts::{FRAC_PI_2, PI};
//!
//! let harness = BenchmarkHarness::new(BenchConfig::default())?;
//! let result = harness.run(Kernel::Sin, Variant::SsrOmp, &[0.0, FRAC_PI_2, PI])?;
//!
//! assert!(result.passed);
//! println!("{}: {} cycles", result.name(), result.cycles);
//! # Ok::<(), ssr_kernels::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`ops`] - Kernel variants, one module per kernel
//! - [`partition`] - Static work partitioning
//! - [`lookup`] - Sine lookup table
//! - [`math`] - Foreign math routines (`sinf`, `exp`)
//! - [`harness`] - Timing and verification of one run
//! - [`suite`] - The kernel × variant × size matrix
//! - [`instrumentation`] - Result logging and speedup reports

pub mod config;
pub mod error;
pub mod harness;
pub mod instrumentation;
pub mod lookup;
pub mod math;
pub mod ops;
pub mod partition;
pub mod suite;
pub mod variant;

pub use config::BenchConfig;
pub use error::{Error, Result};
pub use harness::{verify_vector, BenchmarkHarness, BenchmarkResult, Tolerance, Verification};
pub use instrumentation::{BenchmarkReport, Speedup, TierComparison};
pub use lookup::{DeviceTable, LookupTable, DEFAULT_TABLE_SIZE};
pub use ops::{run_variant, KernelArgs, VariantRun};
pub use partition::{my_range, plan, CoreRange, PartitionPlan};
pub use suite::{kernel_input, BenchmarkSuite};
pub use variant::{Kernel, Optimization, Parallelism, RepeatFolding, Variant};
