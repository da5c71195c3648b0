//! Kernel variants
//!
//! Every variant is a stateless function over cluster memory: it reads `n`
//! elements at `input` and writes `n` elements at `output`. Single-core and
//! SPMD variants are written against one [`CoreContext`]; the fork-join
//! variants own their region and take the whole [`Cluster`].
//!
//! Streaming variants follow the same shape:
//!
//! ```text
//! with_session(read ft0 <- input[start..], write ft1 -> output[start..])
//!   stream_loop(count)
//!     consume ft0 -> fa0
//!     disable | call f(fa0) | enable      (only when f is a foreign routine)
//!     produce fa0 -> ft1
//! ```

pub mod copy;
pub mod sigmoid;
pub mod sin;

use crate::error::{Error, Result};
use crate::lookup::DeviceTable;
use crate::partition::{my_range, plan, CoreRange};
use crate::variant::{Kernel, Parallelism, RepeatFolding, Variant};
use ssr_runtime::{
    Address, Cluster, CoreContext, Element, FpRegister, ProtocolViolation, RegionReport, SessionSummary,
    StreamDescriptor, StreamSession,
};

/// Integer instructions spent turning an index into input and output addresses
pub const ADDRESS_OPS: u64 = 2;

/// Buffers of one kernel invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelArgs {
    pub input: Address,
    pub output: Address,
    pub n: usize,
    /// Required by the lookup-table variants only
    pub table: Option<DeviceTable>,
}

impl KernelArgs {
    pub fn new(input: Address, output: Address, n: usize) -> Self {
        Self {
            input,
            output,
            n,
            table: None,
        }
    }

    pub fn with_table(mut self, table: DeviceTable) -> Self {
        self.table = Some(table);
        self
    }

    fn table(&self) -> Result<&DeviceTable> {
        self.table
            .as_ref()
            .ok_or_else(|| Error::invalid_config("lookup-table variant run without an uploaded table"))
    }
}

/// Execution record of one variant
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRun {
    pub folding: RepeatFolding,
    /// Cycles of the execution region, as seen by the cluster counter
    pub elapsed: u64,
    pub per_core_cycles: Vec<u64>,
    pub violations: Vec<ProtocolViolation>,
}

impl VariantRun {
    fn from_report<R>(report: RegionReport<R>, folding: RepeatFolding) -> Self {
        Self {
            folding,
            elapsed: report.elapsed,
            per_core_cycles: report.per_core_cycles,
            violations: report.violations,
        }
    }
}

/// Run `variant` of `kernel` over `args` on `cluster`
pub fn run_variant(cluster: &mut Cluster, kernel: Kernel, variant: Variant, args: &KernelArgs) -> Result<VariantRun> {
    kernel.ensure_supported(variant)?;

    match variant.parallelism() {
        Parallelism::Single => {
            let report = cluster.run_single(|core| run_single_core(core, kernel, variant, args))?;
            let folding = report.value.clone();
            Ok(VariantRun::from_report(report, folding))
        }
        Parallelism::Spmd => {
            let report = cluster.run_spmd(|core| run_spmd_core(core, kernel, variant, args))?;
            Ok(VariantRun::from_report(report, RepeatFolding::NotUsed))
        }
        Parallelism::ForkJoin => {
            let KernelArgs { input, output, n, .. } = *args;
            let report = match (kernel, variant) {
                (Kernel::Sin, Variant::Omp) => sin::omp(cluster, input, n, output)?,
                (Kernel::Sin, Variant::SsrOmp) => sin::ssr_omp(cluster, input, n, output)?,
                (Kernel::Sigmoid, Variant::SsrOmp) => sigmoid::ssr_omp(cluster, input, n, output)?,
                _ => return Err(Error::UnsupportedVariant { kernel, variant }),
            };
            Ok(VariantRun::from_report(report, RepeatFolding::NotUsed))
        }
    }
}

fn run_single_core(core: &mut CoreContext, kernel: Kernel, variant: Variant, args: &KernelArgs) -> Result<RepeatFolding> {
    let KernelArgs { input, output, n, .. } = *args;
    let unfolded = |()| RepeatFolding::NotUsed;

    match (kernel, variant) {
        (Kernel::Sin, Variant::Baseline) => sin::baseline(core, input, n, output).map(unfolded),
        (Kernel::Sin, Variant::Ssr) => sin::ssr(core, input, n, output).map(unfolded),
        (Kernel::Sin, Variant::SsrFrep) => sin::ssr_frep(core, input, n, output),
        (Kernel::Sin, Variant::LookupTable) => {
            sin::baseline_lookup_table(core, input, n, output, args.table()?).map(unfolded)
        }
        (Kernel::Sin, Variant::SsrLookupTable) => {
            sin::ssr_lookup_table(core, input, n, output, args.table()?).map(unfolded)
        }
        (Kernel::Sigmoid, Variant::Baseline) => sigmoid::baseline(core, input, n, output).map(unfolded),
        (Kernel::Sigmoid, Variant::Ssr) => sigmoid::ssr(core, input, n, output).map(unfolded),
        (Kernel::Sigmoid, Variant::SsrFrep) => sigmoid::ssr_frep(core, input, n, output),
        (Kernel::Copy, Variant::Baseline) => copy::baseline(core, input, n, output).map(unfolded),
        (Kernel::Copy, Variant::Ssr) => copy::ssr(core, input, n, output).map(unfolded),
        (Kernel::Copy, Variant::SsrFrep) => copy::ssr_frep(core, input, n, output),
        _ => Err(Error::UnsupportedVariant { kernel, variant }),
    }
}

fn run_spmd_core(core: &mut CoreContext, kernel: Kernel, variant: Variant, args: &KernelArgs) -> Result<()> {
    let KernelArgs { input, output, n, .. } = *args;

    match (kernel, variant) {
        (Kernel::Sin, Variant::Parallel) => sin::parallel(core, input, n, output),
        (Kernel::Sin, Variant::SsrParallel) => sin::ssr_parallel(core, input, n, output),
        (Kernel::Sigmoid, Variant::Parallel) => sigmoid::parallel(core, input, n, output),
        (Kernel::Sigmoid, Variant::SsrParallel) => sigmoid::ssr_parallel(core, input, n, output),
        _ => Err(Error::UnsupportedVariant { kernel, variant }),
    }
}

// ================================================================================================
// Shared Loop Shapes
// ================================================================================================

/// Range of the calling core under a static partition of `n` elements
pub fn core_range(core: &CoreContext, n: usize) -> Result<CoreRange> {
    let plan = plan(n, core.core_num())?;
    my_range(&plan, core.core_idx())
}

/// Scalar loop: load `fa0`, compute, store the register `body` names
pub(crate) fn scalar_apply<T, I, F>(
    core: &mut CoreContext,
    input: Address,
    output: Address,
    indices: I,
    mut body: F,
) -> Result<()>
where
    T: Element,
    I: IntoIterator<Item = usize>,
    F: FnMut(&mut CoreContext) -> Result<FpRegister>,
{
    for i in indices {
        core.load(FpRegister::FA0, input.element::<T>(i), T::TYPE)?;
        let result = body(core)?;
        core.store(result, output.element::<T>(i))?;
        core.int_ops(ADDRESS_OPS);
        core.loop_control();
    }
    Ok(())
}

/// Streaming loop over `count` elements starting at `start`
///
/// Both data movers are bound to the same window, so each `step` must consume
/// one element from `ft0` and produce one into `ft1`.
pub(crate) fn stream_block<T, F>(
    core: &mut CoreContext,
    input: Address,
    output: Address,
    start: usize,
    count: usize,
    step: F,
) -> Result<SessionSummary>
where
    T: Element,
    F: FnMut(&mut StreamSession<'_>) -> Result<()>,
{
    let read = StreamDescriptor::contiguous::<T>(count).repeat(1).read(input.element::<T>(start));
    let write = StreamDescriptor::contiguous::<T>(count).repeat(1).write(output.element::<T>(start));
    let ((), summary) = core.with_session(Some(read), Some(write), |s| s.stream_loop(count, step))?;
    Ok(summary)
}

/// SPMD streaming shape: stream the base block, then the remainder element
/// with a scalar step
pub(crate) fn stream_partitioned<T, S, F>(
    core: &mut CoreContext,
    input: Address,
    n: usize,
    output: Address,
    step: S,
    scalar: F,
) -> Result<()>
where
    T: Element,
    S: FnMut(&mut StreamSession<'_>) -> Result<()>,
    F: FnMut(&mut CoreContext) -> Result<FpRegister>,
{
    let range = core_range(core, n)?;
    if range.count > 0 {
        stream_block::<T, _>(core, input, output, range.start, range.count, step)?;
    }
    scalar_apply::<T, _, _>(core, input, output, range.extra, scalar)
}
