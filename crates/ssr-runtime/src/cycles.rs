//! Cycle accounting
//!
//! Every instruction a core issues is charged against its own `mcycle`
//! counter according to a [`CostModel`]. Cluster-level regions derive their
//! elapsed time from the slowest participating core.

use crate::memory::MemoryTier;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Integer instructions spent on loop control per iteration (`addi` + `bne`)
pub const LOOP_CONTROL_OPS: u64 = 2;

/// Configuration registers written when a descriptor is set up
/// (bound, stride, repeat, base pointer)
pub const STREAM_CONFIG_WRITES: u64 = 4;

/// Monotonic counter sampled before and after a measured region
pub trait CycleSource {
    fn read(&self) -> u64;
}

/// Per-core `mcycle` register
#[derive(Debug, Clone, Default)]
pub struct CycleCounter {
    mcycle: u64,
}

impl CycleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `cycles`
    pub fn advance(&mut self, cycles: u64) {
        self.mcycle = self.mcycle.saturating_add(cycles);
    }
}

impl CycleSource for CycleCounter {
    fn read(&self) -> u64 {
        self.mcycle
    }
}

/// Host wall clock in nanoseconds since creation
#[derive(Debug, Clone)]
pub struct HostClock {
    origin: Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl CycleSource for HostClock {
    fn read(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Cycles charged per issued instruction class
///
/// Every field is the full cost of one instruction, including any stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub fp_op: u64,
    pub int_op: u64,
    pub load_l1: u64,
    pub load_main: u64,
    pub store_l1: u64,
    pub store_main: u64,
    /// Extra stall per stream element served from L1
    pub stream_l1: u64,
    /// Extra stall per stream element served from main memory
    pub stream_main: u64,
    /// One CSR write (stream enable/disable, descriptor field)
    pub csr_write: u64,
    /// Call and return around a foreign routine, excluding its body
    pub call_overhead: u64,
    pub frep_setup: u64,
    /// Entering a fork-join region
    pub fork: u64,
    /// Closing barrier of a parallel region
    pub barrier: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            fp_op: 1,
            int_op: 1,
            load_l1: 2,
            load_main: 12,
            store_l1: 1,
            store_main: 8,
            stream_l1: 0,
            stream_main: 4,
            csr_write: 1,
            call_overhead: 6,
            frep_setup: 2,
            fork: 40,
            barrier: 20,
        }
    }
}

impl CostModel {
    pub fn load(&self, tier: MemoryTier) -> u64 {
        match tier {
            MemoryTier::L1 => self.load_l1,
            MemoryTier::Main => self.load_main,
        }
    }

    pub fn store(&self, tier: MemoryTier) -> u64 {
        match tier {
            MemoryTier::L1 => self.store_l1,
            MemoryTier::Main => self.store_main,
        }
    }

    pub fn stream(&self, tier: MemoryTier) -> u64 {
        match tier {
            MemoryTier::L1 => self.stream_l1,
            MemoryTier::Main => self.stream_main,
        }
    }
}
