//! Cycle-level simulator of a streaming-register compute cluster
//!
//! This crate provides:
//! - **Memory**: main memory and the cluster-local L1 scratchpad
//! - **Cores**: FP register files, two stream data movers, `mcycle` counters
//! - **Stream sessions**: the checked configure/enable/disable/close protocol
//! - **External calls**: the `fa0` calling convention with scratch clobbering
//! - **FREP**: the FP repetition sequencer
//! - **Cluster**: single-core, SPMD and fork-join execution regions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Cluster                           │
//! │   compute core 0 .. compute core C-1   +  data mover     │
//! └─────────┬───────────────────────────────────────┬────────┘
//!           │ CoreContext (per core)                │
//!           ▼                                       ▼
//!   ┌───────────────┐   ft0 ◄── dm0 (read)   ┌─────────────┐
//!   │ FP registers  │   ft1 ──► dm1 (write)  │ MemoryMgr   │
//!   │ mcycle        │◄──────────────────────►│ main  |  L1 │
//!   └───────────────┘                        └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use ssr_runtime::{
//!     call_across_boundary, Cluster, ClusterConfig, FpInstr, FpRegister, FpValue, ForeignRoutine, MemoryTier,
//!     StreamDescriptor,
//! };
//!
//! struct Double;
//!
//! impl ForeignRoutine for Double {
//!     fn name(&self) -> &'static str {
//!         "double"
//!     }
//!     fn cycles(&self) -> u64 {
//!         4
//!     }
//!     fn eval(&self, arg: FpValue) -> FpValue {
//!         arg.map(|x| 2.0 * x, |x| 2.0 * x)
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut cluster = Cluster::new(ClusterConfig::default())?;
//! let input = cluster.upload(MemoryTier::L1, &[1.0f64, 2.0, 3.0])?;
//! let output = cluster.alloc::<f64>(MemoryTier::Main, 3)?;
//!
//! let read = StreamDescriptor::contiguous::<f64>(3).read(input);
//! let write = StreamDescriptor::contiguous::<f64>(3).write(output);
//! cluster.run_single(|core| {
//!     core.with_session(Some(read), Some(write), |s| {
//!         s.stream_loop(3, |s| {
//!             s.exec(FpInstr::Fmv { dst: FpRegister::FA0, src: FpRegister::FT0 })?;
//!             call_across_boundary(s, &Double)?;
//!             s.exec(FpInstr::Fmv { dst: FpRegister::FT1, src: FpRegister::FA0 })
//!         })
//!     })
//! })?;
//!
//! assert_eq!(cluster.download::<f64>(output, 3)?, vec![2.0, 4.0, 6.0]);
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod context;
pub mod cycles;
pub mod error;
pub mod foreign;
pub mod frep;
pub mod isa;
pub mod memory;
pub mod registers;
pub mod session;
pub mod stream;

// Re-export public API
pub use cluster::{Cluster, ClusterConfig, RegionReport, DEFAULT_L1_CAPACITY, DEFAULT_TOTAL_CORES};
pub use context::{CoreContext, ProtocolCheck};
pub use cycles::{CostModel, CycleCounter, CycleSource, HostClock, LOOP_CONTROL_OPS};
pub use error::{ProtocolViolation, Result, RuntimeError};
pub use foreign::{call_across_boundary, ForeignRoutine, ARGUMENT_REGISTER};
pub use frep::FREP_MAX_INSTRUCTIONS;
pub use isa::{Element, FloatType, FpInstr, FpRegister, FpValue};
pub use memory::{Address, BufferHandle, MemoryManager, MemoryTier};
pub use session::{SessionState, SessionSummary, StreamSession};
pub use stream::{AddressGenerator, DataMover, StreamDescriptor, StreamDirection};
