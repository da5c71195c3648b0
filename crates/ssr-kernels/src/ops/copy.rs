//! Identity kernel over `f32`
//!
//! Copy has no foreign call, so it is the one kernel whose streaming body is
//! straight-line and can be folded by FREP.

use super::{scalar_apply, stream_block};
use crate::error::Result;
use crate::variant::RepeatFolding;
use ssr_runtime::{Address, CoreContext, FpInstr, FpRegister, StreamDescriptor};

/// `ft1 <- ft0`, one element through both streams
const PASS_THROUGH: FpInstr = FpInstr::Fmv {
    dst: FpRegister::FT1,
    src: FpRegister::FT0,
};

pub fn baseline(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    scalar_apply::<f32, _, _>(core, input, output, 0..n, |_| Ok(FpRegister::FA0))
}

pub fn ssr(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<()> {
    stream_block::<f32, _>(core, input, output, 0, n, |s| Ok(s.exec(PASS_THROUGH)?))?;
    Ok(())
}

/// Replay the single-instruction body `n` times on the sequencer
pub fn ssr_frep(core: &mut CoreContext, input: Address, n: usize, output: Address) -> Result<RepeatFolding> {
    let read = StreamDescriptor::contiguous::<f32>(n).read(input);
    let write = StreamDescriptor::contiguous::<f32>(n).write(output);
    core.with_session(Some(read), Some(write), |s| s.frep(n, &[PASS_THROUGH]))?;
    Ok(RepeatFolding::Folded { iterations: n })
}
