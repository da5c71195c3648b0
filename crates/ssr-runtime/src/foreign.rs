//! External-call boundary
//!
//! Foreign routines (libm `sinf`, `exp`, ...) are opaque: they receive their
//! argument in `fa0`, return their result in `fa0`, and may use every other
//! caller-saved FP register as scratch. That includes the stream-bound
//! `ft0`/`ft1`, so a call made while redirection is enabled would pull from
//! and push into the live streams.
//!
//! The safe sequence inside a stream loop is therefore:
//!
//! 1. consume the input (`fmv fa0, ft0`, or an operation reading `ft0`)
//! 2. disable redirection
//! 3. call the routine
//! 4. re-enable redirection
//! 5. produce the output (`fmv ft1, fa0`, or an operation writing `ft1`)
//!
//! [`call_across_boundary`] performs steps 2-4.

use crate::context::CoreContext;
use crate::error::{ProtocolViolation, Result};
use crate::isa::{FpRegister, FpValue};
use crate::session::StreamSession;
use crate::stream::{DataMover, StreamDirection};

/// Register carrying both the argument and the result
pub const ARGUMENT_REGISTER: FpRegister = FpRegister::FA0;

/// An opaque routine with a single FP argument and result
pub trait ForeignRoutine: Send + Sync {
    /// Symbol name for logs and violation reports
    fn name(&self) -> &'static str;

    /// Cycles spent inside the routine body
    fn cycles(&self) -> u64;

    /// Result at the argument's precision
    fn eval(&self, arg: FpValue) -> FpValue;
}

impl CoreContext {
    /// `call routine` with the calling convention applied
    pub fn call_foreign(&mut self, routine: &dyn ForeignRoutine) -> Result<()> {
        if self.is_streaming() {
            self.violate(ProtocolViolation::ForeignCallWhileEnabled {
                routine: routine.name(),
            })?;
        }

        let arg = self.read_architectural(ARGUMENT_REGISTER)?;
        let result = routine.eval(arg);
        self.charge(self.cost_model().call_overhead + routine.cycles());

        if self.is_streaming() {
            self.clobber_live_streams()?;
        }
        let registers = self.registers_mut();
        registers.clobber_caller_saved(ARGUMENT_REGISTER);
        registers.set(ARGUMENT_REGISTER, result);
        Ok(())
    }

    /// The callee's scratch use of `ft0`/`ft1` as seen by live streams:
    /// one element is pulled from each read stream and one unspecified value
    /// is pushed to each write stream.
    fn clobber_live_streams(&mut self) -> Result<()> {
        for dm in DataMover::ALL {
            let live = match self.generator(dm) {
                Some(gen) if !gen.is_exhausted() => Some((gen.direction(), gen.descriptor().element())),
                _ => None,
            };
            match live {
                Some((StreamDirection::Read, _)) => {
                    self.stream_pop(dm)?;
                }
                Some((StreamDirection::Write, ty)) => self.stream_push(dm, FpValue::poison(ty))?,
                None => {}
            }
        }
        Ok(())
    }
}

/// Steps 2-4 of the boundary protocol: disable, call, re-enable
pub fn call_across_boundary(session: &mut StreamSession<'_>, routine: &dyn ForeignRoutine) -> Result<()> {
    session.disable()?;
    session.call_foreign(routine)?;
    session.enable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::CostModel;
    use crate::isa::FpInstr;
    use crate::memory::{Address, MemoryManager, MemoryTier};
    use crate::registers::RegisterValue;
    use crate::stream::StreamDescriptor;
    use crate::ProtocolCheck;
    use parking_lot::RwLock;
    use std::sync::Arc;

    struct Square;

    impl ForeignRoutine for Square {
        fn name(&self) -> &'static str {
            "square"
        }

        fn cycles(&self) -> u64 {
            10
        }

        fn eval(&self, arg: FpValue) -> FpValue {
            arg.map(|x| x * x, |x| x * x)
        }
    }

    fn core(check: ProtocolCheck) -> CoreContext {
        let memory = Arc::new(RwLock::new(MemoryManager::new(1024)));
        CoreContext::new(0, 1, memory, CostModel::default(), check)
    }

    fn vector(core: &CoreContext, data: &[f32]) -> Address {
        let mut mem = core.memory().write();
        let addr = Address::base(mem.allocate_array::<f32>(MemoryTier::Main, data.len()).unwrap());
        mem.write_slice(addr, data).unwrap();
        addr
    }

    #[test]
    fn test_call_uses_fa0_and_clobbers_scratch() {
        let mut core = core(ProtocolCheck::Strict);
        core.exec(FpInstr::Fli {
            dst: FpRegister::FA0,
            value: FpValue::F32(3.0),
        })
        .unwrap();
        core.exec(FpInstr::Fli {
            dst: FpRegister::FT2,
            value: FpValue::F32(1.0),
        })
        .unwrap();
        core.exec(FpInstr::Fli {
            dst: FpRegister::FS0,
            value: FpValue::F32(2.0),
        })
        .unwrap();

        let before = core.cycles();
        core.call_foreign(&Square).unwrap();

        assert_eq!(core.read_architectural(FpRegister::FA0).unwrap(), FpValue::F32(9.0));
        assert_eq!(core.read_architectural(FpRegister::FS0).unwrap(), FpValue::F32(2.0));
        assert!(matches!(
            core.registers_mut().get(FpRegister::FT2),
            RegisterValue::Clobbered(_)
        ));
        assert_eq!(core.cycles() - before, CostModel::default().call_overhead + 10);
    }

    #[test]
    fn test_five_phase_sequence() {
        let mut core = core(ProtocolCheck::Strict);
        let input = vector(&core, &[1.0, 2.0, 3.0]);
        let output = vector(&core, &[0.0; 3]);

        let read = StreamDescriptor::contiguous::<f32>(3).read(input);
        let write = StreamDescriptor::contiguous::<f32>(3).write(output);
        core.with_session(Some(read), Some(write), |s| {
            s.stream_loop(3, |s| {
                s.exec(FpInstr::Fmv {
                    dst: FpRegister::FA0,
                    src: FpRegister::FT0,
                })?;
                call_across_boundary(s, &Square)?;
                s.exec(FpInstr::Fmv {
                    dst: FpRegister::FT1,
                    src: FpRegister::FA0,
                })
            })
        })
        .unwrap();

        let result: Vec<f32> = core.memory().read().read_vec(output, 3).unwrap();
        assert_eq!(result, vec![1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_call_while_enabled_strict() {
        let mut core = core(ProtocolCheck::Strict);
        let input = vector(&core, &[1.0]);
        let read = StreamDescriptor::contiguous::<f32>(1).read(input);

        let err = core
            .with_session(Some(read), None, |s| {
                s.exec(FpInstr::Fmv {
                    dst: FpRegister::FA0,
                    src: FpRegister::FT0,
                })?;
                s.call_foreign(&Square)
            })
            .unwrap_err();
        assert!(matches!(
            err.violation(),
            Some(ProtocolViolation::ForeignCallWhileEnabled { routine: "square" })
        ));
    }

    #[test]
    fn test_call_while_enabled_permissive_corrupts_streams() {
        let mut core = core(ProtocolCheck::Permissive);
        let input = vector(&core, &[1.0, 2.0]);
        let output = vector(&core, &[0.0, 0.0]);
        let read = StreamDescriptor::contiguous::<f32>(2).read(input);
        let write = StreamDescriptor::contiguous::<f32>(2).write(output);

        core.with_session(Some(read), Some(write), |s| {
            s.exec(FpInstr::Fmv {
                dst: FpRegister::FA0,
                src: FpRegister::FT0,
            })?;
            s.call_foreign(&Square)?;
            s.exec(FpInstr::Fmv {
                dst: FpRegister::FT1,
                src: FpRegister::FA0,
            })
        })
        .unwrap();

        let result: Vec<f32> = core.memory().read().read_vec(output, 2).unwrap();
        assert!(result[0].is_nan(), "callee scratch write landed in the output stream");
        assert_eq!(result[1], 1.0);
        assert!(core
            .violations()
            .contains(&ProtocolViolation::ForeignCallWhileEnabled { routine: "square" }));
    }
}
