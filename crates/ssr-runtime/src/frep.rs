//! FREP hardware loop
//!
//! The sequencer captures a short block of FP instructions and replays it
//! `count` times with no integer loop control. Only [`FpInstr`] can appear in
//! the block, so a body that needs a foreign call cannot be expressed here.

use crate::error::{Result, RuntimeError};
use crate::isa::FpInstr;
use crate::session::StreamSession;

/// Largest block the sequencer can hold
pub const FREP_MAX_INSTRUCTIONS: usize = 16;

impl StreamSession<'_> {
    /// `frep.o count, body`
    ///
    /// Each replay is checked like a [`stream_loop`](StreamSession::stream_loop)
    /// iteration.
    pub fn frep(&mut self, count: usize, body: &[FpInstr]) -> Result<()> {
        if body.is_empty() {
            return Err(RuntimeError::InvalidFrep("empty body".to_string()));
        }
        if body.len() > FREP_MAX_INSTRUCTIONS {
            return Err(RuntimeError::InvalidFrep(format!(
                "{} instructions exceed the sequencer capacity of {}",
                body.len(),
                FREP_MAX_INSTRUCTIONS
            )));
        }

        let setup = self.cost_model().frep_setup;
        self.charge(setup);

        let mut replay = |s: &mut Self| body.iter().try_for_each(|instr| s.exec(*instr));
        for iteration in 0..count {
            self.balanced_iteration(iteration, &mut replay)?;
        }

        tracing::trace!(core = self.core_idx(), count, body = body.len(), "frep finished");
        Ok(())
    }
}
