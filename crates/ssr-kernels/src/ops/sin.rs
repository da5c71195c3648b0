//! Element-wise `sinf` over `f32`

use super::{core_range, scalar_apply, stream_block, stream_partitioned};
use crate::error::{Error, Result};
use crate::lookup::DeviceTable;
use crate::math::Sinf;
use crate::variant::RepeatFolding;
use ssr_runtime::{
    call_across_boundary, Address, Cluster, CoreContext, FloatType, FpInstr, FpRegister, FpValue, RegionReport,
    StreamSession,
};

const CONSUME: FpInstr = FpInstr::Fmv {
    dst: FpRegister::FA0,
    src: FpRegister::FT0,
};

const PRODUCE: FpInstr = FpInstr::Fmv {
    dst: FpRegister::FT1,
    src: FpRegister::FA0,
};

/// `fa0 = sinf(fa0)`
fn scalar_sin(core: &mut CoreContext) -> Result<FpRegister> {
    core.call_foreign(&Sinf)?;
    Ok(FpRegister::FA0)
}

/// One five-phase iteration
fn streamed_sin(s: &mut StreamSession<'_>) -> Result<()> {
    s.exec(CONSUME)?;
    call_across_boundary(s, &Sinf)?;
    s.exec(PRODUCE)?;
    Ok(())
}

/// Scalar reference
pub fn baseline(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    scalar_apply::<f32, _, _>(core, input, output, 0..n, scalar_sin)
}

/// Five-phase streaming loop over `[0, n)` on one core
pub fn ssr(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    stream_block::<f32, _>(core, input, output, 0, n, streamed_sin)?;
    Ok(())
}

/// Streaming loop with FREP requested
///
/// The body contains a call, which the sequencer cannot replay, so this runs
/// [`ssr`] unchanged and says so.
pub fn ssr_frep(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<RepeatFolding> {
    ssr(core, input, n, output)?;
    Ok(RepeatFolding::NotApplicable {
        reason: "loop body calls sinf".to_string(),
    })
}

/// Leave `table[floor(src * factor)]` in `fa1`
///
/// Expects the scale factor in `fa2`.
fn lookup_into_fa1(core: &mut CoreContext, src: FpRegister, table: &DeviceTable) -> Result<()> {
    core.exec(FpInstr::Fmul {
        dst: FpRegister::FA1,
        lhs: src,
        rhs: FpRegister::FA2,
    })?;
    let scaled = core.read_scalar(FpRegister::FA1)?;
    let index = table.index_for_scaled(scaled).ok_or(Error::LookupOutOfRange {
        value: table.unscale(scaled),
        size: table.size,
    })?;
    core.int_ops(1);
    core.load(FpRegister::FA1, table.entry(index), FloatType::F32)?;
    Ok(())
}

fn load_factor(core: &mut CoreContext, table: &DeviceTable) -> Result<()> {
    core.exec(FpInstr::Fli {
        dst: FpRegister::FA2,
        value: FpValue::F32(table.factor),
    })?;
    Ok(())
}

/// Scalar table lookup; inputs must lie in `[0, 2π)`
pub fn baseline_lookup_table(
    core: &mut CoreContext,
    input: Address,
    n: usize,
    output: Address,
    table: &DeviceTable,
) -> Result<()> {
    load_factor(core, table)?;
    scalar_apply::<f32, _, _>(core, input, output, 0..n, |core| {
        lookup_into_fa1(core, FpRegister::FA0, table)?;
        Ok(FpRegister::FA1)
    })
}

/// Streamed table lookup
///
/// Nothing crosses the call boundary, so the session stays enabled for the
/// whole loop.
pub fn ssr_lookup_table(
    core: &mut CoreContext,
    input: Address,
    n: usize,
    output: Address,
    table: &DeviceTable,
) -> Result<()> {
    load_factor(core, table)?;
    stream_block::<f32, _>(core, input, output, 0, n, |s| {
        lookup_into_fa1(s, FpRegister::FT0, table)?;
        s.exec(FpInstr::Fmv {
            dst: FpRegister::FT1,
            src: FpRegister::FA1,
        })?;
        Ok(())
    })?;
    Ok(())
}

/// Scalar SPMD: each core handles its own partition
pub fn parallel(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    let range = core_range(core, n)?;
    scalar_apply::<f32, _, _>(core, input, output, range.indices(), scalar_sin)
}

/// Streaming SPMD: base block streamed, remainder element scalar
pub fn ssr_parallel(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    stream_partitioned::<f32, _, _>(core, input, n, output, streamed_sin, scalar_sin)
}

/// Scalar fork-join region with a static schedule
pub fn omp(cluster: &mut Cluster, input: Address, n: usize, output: Address) -> Result<RegionReport<Vec<()>>> {
    cluster.fork_join(|core| parallel(core, input, n, output))
}

/// Streaming fork-join region
pub fn ssr_omp(cluster: &mut Cluster, input: Address, n: usize, output: Address) -> Result<RegionReport<Vec<()>>> {
    cluster.fork_join(|core| ssr_parallel(core, input, n, output))
}
