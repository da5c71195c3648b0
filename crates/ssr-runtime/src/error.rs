//! Error types for the core simulator

use crate::isa::{FloatType, FpRegister};
use crate::memory::MemoryTier;
use crate::session::SessionState;
use crate::stream::DataMover;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Misuse of the stream unit or the external-call boundary
///
/// Under [`ProtocolCheck::Strict`](crate::ProtocolCheck) every violation is
/// returned as an error at the point it happens. Under `Permissive` it is
/// recorded on the core and execution continues with hardware semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// Descriptor written while the previous pattern still has pending accesses
    #[error("{dm} reconfigured while its generator still has {remaining} pending accesses")]
    GeneratorStillArmed { dm: DataMover, remaining: u64 },

    /// Streaming enabled with no data mover configured
    #[error("stream redirection enabled with no configured data mover")]
    EnableUnconfigured,

    /// Session action not allowed from the current state
    #[error("{action} not allowed while session is {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    /// Stream-bound register touched while redirection is disabled
    #[error("{register} accessed while stream redirection is disabled and {dm} is armed")]
    RegisterWhileDisabled { register: FpRegister, dm: DataMover },

    /// Foreign routine invoked while redirection is live
    #[error("foreign routine `{routine}` called while stream redirection is enabled")]
    ForeignCallWhileEnabled { routine: &'static str },

    /// Read from a write stream or write to a read stream
    #[error("{register} used against the direction of {dm}")]
    DirectionMismatch { register: FpRegister, dm: DataMover },

    /// More accesses than the pattern describes
    #[error("{dm} accessed past the end of its pattern")]
    StreamExhausted { dm: DataMover },

    /// Pattern not fully consumed when the session closed
    #[error("{dm} closed with {remaining} accesses left in its pattern")]
    UnconsumedPattern { dm: DataMover, remaining: u64 },

    /// A loop iteration did not move exactly one element through a stream
    #[error("iteration {iteration} moved {moved} elements through {dm} (expected 1)")]
    IterationImbalance {
        iteration: usize,
        dm: DataMover,
        moved: u64,
    },

    /// Register read after a foreign call overwrote it
    #[error("{register} read after a foreign call clobbered it")]
    ClobberedRead { register: FpRegister },

    /// Session guard dropped without `close`
    #[error("stream session dropped without being closed")]
    SessionLeaked,
}

/// Errors that can occur while running code on the simulated cluster
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Stream or call protocol misuse
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// Invalid buffer handle
    #[error("invalid buffer handle: {0}")]
    InvalidBufferHandle(u64),

    /// Memory access out of bounds
    #[error("memory access out of bounds: offset {offset} + size {size} > buffer size {buffer_size}")]
    OutOfBounds {
        offset: usize,
        size: usize,
        buffer_size: usize,
    },

    /// Allocation exceeds a tier's capacity
    #[error("out of {tier} memory: requested {requested} bytes, {available} available")]
    OutOfMemory {
        tier: MemoryTier,
        requested: usize,
        available: usize,
    },

    /// Malformed stream descriptor
    #[error("invalid stream descriptor: {0}")]
    InvalidDescriptor(String),

    /// Malformed FREP block
    #[error("invalid frep block: {0}")]
    InvalidFrep(String),

    /// Register read before any write
    #[error("uninitialized register: {0}")]
    UninitializedRegister(FpRegister),

    /// Operand widths do not match
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: FloatType, actual: FloatType },

    /// Core index outside the cluster
    #[error("invalid core index {index} (cluster has {count} compute cores)")]
    InvalidCoreIndex { index: usize, count: usize },

    /// Cluster configuration rejected
    #[error("invalid cluster configuration: {0}")]
    InvalidConfig(String),
}

impl RuntimeError {
    /// Create an invalid descriptor error
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        Self::InvalidDescriptor(msg.into())
    }

    /// Create an invalid cluster configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// The protocol violation carried by this error, if any
    pub fn violation(&self) -> Option<ProtocolViolation> {
        match self {
            RuntimeError::Protocol(v) => Some(*v),
            _ => None,
        }
    }
}
