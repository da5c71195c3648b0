//! Stream session lifecycle
//!
//! A [`StreamSession`] is the scoped guard around one use of the stream unit:
//!
//! ```text
//! Configured --enable--> Enabled <--disable/enable--> Disabled
//!      \                    |                             |
//!       +-------------------+-----------close-------------+--> TornDown
//! ```
//!
//! Closing verifies that every configured pattern was consumed exactly. A
//! session that is dropped without `close` is recorded as leaked and leaves
//! its generators armed, which the next configuration on the same core will
//! trip over.

use crate::context::CoreContext;
use crate::error::{ProtocolViolation, Result, RuntimeError};
use crate::stream::{DataMover, StreamDescriptor, StreamDirection};
use serde::Serialize;
use ssr_tracing::perf_event;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Configured,
    Enabled,
    Disabled,
    TornDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Configured => write!(f, "configured"),
            SessionState::Enabled => write!(f, "enabled"),
            SessionState::Disabled => write!(f, "disabled"),
            SessionState::TornDown => write!(f, "torn down"),
        }
    }
}

/// Accounting returned by [`StreamSession::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionSummary {
    /// Elements read through read streams
    pub consumed: u64,
    /// Elements written through write streams
    pub produced: u64,
    /// Core cycles spent between open and close
    pub cycles: u64,
    /// Violations recorded during the session (permissive mode only)
    pub violations: usize,
}

/// Scoped use of a core's stream unit
///
/// Dereferences to the [`CoreContext`] so that instructions issued inside the
/// session see stream redirection.
pub struct StreamSession<'a> {
    core: &'a mut CoreContext,
    state: SessionState,
    start_cycles: u64,
    start_violations: usize,
}

impl CoreContext {
    /// Start a session with no data mover configured yet
    pub fn open_session(&mut self) -> StreamSession<'_> {
        let start_cycles = self.cycles();
        let start_violations = self.violations().len();
        StreamSession {
            core: self,
            state: SessionState::Configured,
            start_cycles,
            start_violations,
        }
    }

    /// Configure, enable, run `body`, then close
    ///
    /// The session is closed on every path. When `body` fails, its error is
    /// returned and a close failure is only logged.
    pub fn with_session<R, E>(
        &mut self,
        read: Option<StreamDescriptor>,
        write: Option<StreamDescriptor>,
        body: impl FnOnce(&mut StreamSession<'_>) -> std::result::Result<R, E>,
    ) -> std::result::Result<(R, SessionSummary), E>
    where
        E: From<RuntimeError>,
    {
        let mut session = self.open_session();
        let outcome = session.run(read, write, body);
        let closed = session.close();

        match (outcome, closed) {
            (Ok(value), Ok(summary)) => Ok((value, summary)),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!(error = %close_err, "stream session close failed after body error");
                Err(err)
            }
        }
    }
}

impl<'a> StreamSession<'a> {
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn run<R, E>(
        &mut self,
        read: Option<StreamDescriptor>,
        write: Option<StreamDescriptor>,
        body: impl FnOnce(&mut Self) -> std::result::Result<R, E>,
    ) -> std::result::Result<R, E>
    where
        E: From<RuntimeError>,
    {
        if let Some(descriptor) = read {
            self.configure(DataMover::Dm0, descriptor)?;
        }
        if let Some(descriptor) = write {
            self.configure(DataMover::Dm1, descriptor)?;
        }
        self.enable()?;
        body(self)
    }

    /// Write a descriptor into `dm` (`snrt_ssr_loop_1d` + `repeat` + `read`/`write`)
    pub fn configure(&mut self, dm: DataMover, descriptor: StreamDescriptor) -> Result<()> {
        if self.state != SessionState::Configured {
            self.transition_violation("configure")?;
        }
        self.core.configure_stream(dm, descriptor)
    }

    /// Turn register redirection on
    pub fn enable(&mut self) -> Result<()> {
        match self.state {
            SessionState::Configured | SessionState::Disabled => {}
            _ => self.transition_violation("enable")?,
        }
        if !self.core.has_generator() {
            self.core.violate(ProtocolViolation::EnableUnconfigured)?;
        }
        self.core.set_streaming(true);
        self.state = SessionState::Enabled;
        Ok(())
    }

    /// Turn register redirection off; generators keep their position
    pub fn disable(&mut self) -> Result<()> {
        if self.state != SessionState::Enabled {
            self.transition_violation("disable")?;
        }
        self.core.set_streaming(false);
        self.state = SessionState::Disabled;
        Ok(())
    }

    /// Run `step` exactly `n` times, checking that each iteration moves one
    /// element through every configured stream
    pub fn stream_loop<F, E>(&mut self, n: usize, mut step: F) -> std::result::Result<(), E>
    where
        F: FnMut(&mut Self) -> std::result::Result<(), E>,
        E: From<RuntimeError>,
    {
        for iteration in 0..n {
            self.balanced_iteration(iteration, &mut step)?;
            self.core.loop_control();
        }
        Ok(())
    }

    pub(crate) fn balanced_iteration<F, E>(&mut self, iteration: usize, step: &mut F) -> std::result::Result<(), E>
    where
        F: FnMut(&mut Self) -> std::result::Result<(), E>,
        E: From<RuntimeError>,
    {
        let before = self.core.issued_counts();
        step(self)?;
        let after = self.core.issued_counts();

        for dm in DataMover::ALL {
            if let (Some(b), Some(a)) = (before[dm.index()], after[dm.index()]) {
                let moved = a - b;
                if moved != 1 {
                    self.core
                        .violate(ProtocolViolation::IterationImbalance { iteration, dm, moved })?;
                }
            }
        }
        Ok(())
    }

    /// Disable redirection if needed and verify every pattern was consumed
    pub fn close(mut self) -> Result<SessionSummary> {
        if self.state == SessionState::Enabled {
            self.core.set_streaming(false);
        }
        self.state = SessionState::TornDown;

        let mut summary = SessionSummary::default();
        for dm in DataMover::ALL {
            if let Some(gen) = self.core.generator(dm) {
                match gen.direction() {
                    StreamDirection::Read => summary.consumed += gen.issued(),
                    StreamDirection::Write => summary.produced += gen.issued(),
                }
            }
        }

        for (dm, remaining) in self.core.release_generators() {
            self.core
                .violate(ProtocolViolation::UnconsumedPattern { dm, remaining })?;
        }

        summary.cycles = self.core.cycles() - self.start_cycles;
        summary.violations = self.core.violations().len().saturating_sub(self.start_violations);

        perf_event!(
            "stream_session_closed",
            core = self.core.core_idx(),
            consumed = summary.consumed,
            produced = summary.produced,
            cycles = summary.cycles,
            violations = summary.violations,
        );
        Ok(summary)
    }

    fn transition_violation(&mut self, action: &'static str) -> Result<()> {
        let state = self.state;
        self.core
            .violate(ProtocolViolation::InvalidTransition { state, action })
    }
}

impl Deref for StreamSession<'_> {
    type Target = CoreContext;

    fn deref(&self) -> &CoreContext {
        self.core
    }
}

impl DerefMut for StreamSession<'_> {
    fn deref_mut(&mut self) -> &mut CoreContext {
        self.core
    }
}

impl Drop for StreamSession<'_> {
    fn drop(&mut self) {
        if self.state != SessionState::TornDown {
            tracing::error!(
                core = self.core.core_idx(),
                state = %self.state,
                "stream session dropped without close"
            );
            self.core.record(ProtocolViolation::SessionLeaked);
        }
    }
}
