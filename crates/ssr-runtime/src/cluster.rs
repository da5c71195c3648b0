//! Compute cluster and its execution regions
//!
//! A cluster has `total_cores` cores. The last one is the data-mover core and
//! never runs compute work, so every region executes on
//! `total_cores - 1` compute cores. Each simulated core runs on a rayon worker
//! with its own [`CoreContext`]; only cluster memory is shared.
//!
//! The cluster clock advances by the elapsed time of each region:
//! setup cost, plus the slowest participating core, plus the closing barrier.

use crate::context::{CoreContext, ProtocolCheck};
use crate::cycles::{CostModel, CycleCounter, CycleSource};
use crate::error::{ProtocolViolation, Result, RuntimeError};
use crate::isa::Element;
use crate::memory::{Address, MemoryManager, MemoryTier};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use ssr_tracing::perf_span;
use std::sync::Arc;

/// Default L1 scratchpad size
pub const DEFAULT_L1_CAPACITY: usize = 128 * 1024;

/// Default core count: eight compute cores plus the data mover
pub const DEFAULT_TOTAL_CORES: usize = 9;

/// Shape and behaviour of the simulated cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Cores in the cluster, including the data-mover core
    pub total_cores: usize,
    pub l1_capacity_bytes: usize,
    pub protocol_check: ProtocolCheck,
    pub cost: CostModel,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            total_cores: DEFAULT_TOTAL_CORES,
            l1_capacity_bytes: DEFAULT_L1_CAPACITY,
            protocol_check: ProtocolCheck::Strict,
            cost: CostModel::default(),
        }
    }
}

impl ClusterConfig {
    /// Cores available to compute regions
    pub fn compute_cores(&self) -> usize {
        self.total_cores.saturating_sub(1)
    }

    pub fn with_total_cores(mut self, total_cores: usize) -> Self {
        self.total_cores = total_cores;
        self
    }

    pub fn with_protocol_check(mut self, check: ProtocolCheck) -> Self {
        self.protocol_check = check;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_cores < 2 {
            return Err(RuntimeError::invalid_config(format!(
                "total_cores must be at least 2 (one compute core plus the data mover), got {}",
                self.total_cores
            )));
        }
        Ok(())
    }
}

/// Outcome of one execution region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionReport<R> {
    pub value: R,
    /// `mcycle` of each participating core at the end of the region
    pub per_core_cycles: Vec<u64>,
    /// Cluster cycles the region took
    pub elapsed: u64,
    /// Violations recorded by the participating cores (permissive mode)
    pub violations: Vec<ProtocolViolation>,
}

/// A simulated compute cluster
#[derive(Debug)]
pub struct Cluster {
    config: ClusterConfig,
    memory: Arc<RwLock<MemoryManager>>,
    clock: CycleCounter,
}

impl Cluster {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        let memory = Arc::new(RwLock::new(MemoryManager::new(config.l1_capacity_bytes)));
        tracing::debug!(
            total_cores = config.total_cores,
            l1_capacity = config.l1_capacity_bytes,
            check = ?config.protocol_check,
            "cluster created"
        );
        Ok(Self {
            config,
            memory,
            clock: CycleCounter::new(),
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn compute_cores(&self) -> usize {
        self.config.compute_cores()
    }

    pub fn memory(&self) -> &Arc<RwLock<MemoryManager>> {
        &self.memory
    }

    // ============================================================================================
    // Host Side Memory Access
    // ============================================================================================

    /// Allocate a zeroed array of `len` elements
    pub fn alloc<T: Element>(&self, tier: MemoryTier, len: usize) -> Result<Address> {
        let handle = self.memory.write().allocate_array::<T>(tier, len)?;
        Ok(Address::base(handle))
    }

    /// Allocate an array in `tier` and fill it from the host
    pub fn upload<T: Element>(&self, tier: MemoryTier, data: &[T]) -> Result<Address> {
        let mut mem = self.memory.write();
        let addr = Address::base(mem.allocate_array::<T>(tier, data.len())?);
        mem.write_slice(addr, data)?;
        Ok(addr)
    }

    /// Read `len` elements back to the host
    pub fn download<T: Element>(&self, addr: Address, len: usize) -> Result<Vec<T>> {
        self.memory.read().read_vec(addr, len)
    }

    // ============================================================================================
    // Execution Regions
    // ============================================================================================

    fn core(&self, core_idx: usize, core_num: usize) -> CoreContext {
        CoreContext::new(
            core_idx,
            core_num,
            Arc::clone(&self.memory),
            self.config.cost,
            self.config.protocol_check,
        )
    }

    /// Run `f` on compute core 0 while the others idle
    pub fn run_single<R, E>(
        &mut self,
        f: impl FnOnce(&mut CoreContext) -> std::result::Result<R, E>,
    ) -> std::result::Result<RegionReport<R>, E>
    where
        E: From<RuntimeError>,
    {
        let mut core = self.core(0, 1);
        let value = f(&mut core)?;

        let elapsed = core.cycles();
        self.clock.advance(elapsed);
        Ok(RegionReport {
            value,
            per_core_cycles: vec![elapsed],
            elapsed,
            violations: core.take_violations(),
        })
    }

    /// Run `f` on every compute core, followed by a cluster barrier
    ///
    /// This is the SPMD entry: all cores are already executing and call the
    /// kernel with their own identity.
    pub fn run_spmd<R, E, F>(&mut self, f: F) -> std::result::Result<RegionReport<Vec<R>>, E>
    where
        R: Send,
        E: From<RuntimeError> + Send,
        F: Fn(&mut CoreContext) -> std::result::Result<R, E> + Sync,
    {
        self.region("spmd", 0, f)
    }

    /// Enter a fork-join region on every compute core
    ///
    /// Charges the region setup on top of the slowest core and the join barrier.
    pub fn fork_join<R, E, F>(&mut self, f: F) -> std::result::Result<RegionReport<Vec<R>>, E>
    where
        R: Send,
        E: From<RuntimeError> + Send,
        F: Fn(&mut CoreContext) -> std::result::Result<R, E> + Sync,
    {
        let fork = self.config.cost.fork;
        self.region("fork_join", fork, f)
    }

    fn region<R, E, F>(&mut self, kind: &'static str, setup: u64, f: F) -> std::result::Result<RegionReport<Vec<R>>, E>
    where
        R: Send,
        E: From<RuntimeError> + Send,
        F: Fn(&mut CoreContext) -> std::result::Result<R, E> + Sync,
    {
        let cores = self.compute_cores();
        let _span = perf_span!("cluster_region", kind = kind, cores = cores);

        let this = &*self;
        let outcomes = (0..cores)
            .into_par_iter()
            .map(|core_idx| {
                let mut core = this.core(core_idx, cores);
                let value = f(&mut core)?;
                Ok((value, core.cycles(), core.take_violations()))
            })
            .collect::<std::result::Result<Vec<_>, E>>()?;

        let mut values = Vec::with_capacity(cores);
        let mut per_core_cycles = Vec::with_capacity(cores);
        let mut violations = Vec::new();
        for (value, cycles, core_violations) in outcomes {
            values.push(value);
            per_core_cycles.push(cycles);
            violations.extend(core_violations);
        }

        let slowest = per_core_cycles.iter().copied().max().unwrap_or(0);
        let elapsed = setup + slowest + self.config.cost.barrier;
        self.clock.advance(elapsed);

        tracing::debug!(kind, cores, slowest, elapsed, "region finished");
        Ok(RegionReport {
            value: values,
            per_core_cycles,
            elapsed,
            violations,
        })
    }
}

impl CycleSource for Cluster {
    /// Cluster-wide cycle counter, advanced by each completed region
    fn read(&self) -> u64 {
        self.clock.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{FloatType, FpRegister};

    #[test]
    fn test_default_config() {
        let config = ClusterConfig::default();
        assert_eq!(config.total_cores, 9);
        assert_eq!(config.compute_cores(), 8);
        assert_eq!(config.l1_capacity_bytes, 128 * 1024);
        assert_eq!(config.protocol_check, ProtocolCheck::Strict);
    }

    #[test]
    fn test_config_rejects_single_core() {
        let err = Cluster::new(ClusterConfig::default().with_total_cores(1)).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ClusterConfig = serde_json::from_str(r#"{"total_cores": 5, "protocol_check": "permissive"}"#).unwrap();
        assert_eq!(config.compute_cores(), 4);
        assert_eq!(config.protocol_check, ProtocolCheck::Permissive);
        assert_eq!(config.l1_capacity_bytes, DEFAULT_L1_CAPACITY);
    }

    #[test]
    fn test_upload_download() {
        let cluster = Cluster::new(ClusterConfig::default()).unwrap();
        let addr = cluster.upload(MemoryTier::L1, &[1.0f64, 2.0]).unwrap();
        assert_eq!(cluster.download::<f64>(addr, 2).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_spmd_identity_and_elapsed() {
        let mut cluster = Cluster::new(ClusterConfig::default().with_total_cores(5)).unwrap();
        let report = cluster
            .run_spmd(|core| {
                // core i does i+1 units of work
                core.int_ops(core.core_idx() as u64 + 1);
                Ok::<_, RuntimeError>((core.core_idx(), core.core_num()))
            })
            .unwrap();

        assert_eq!(report.value, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
        assert_eq!(report.per_core_cycles, vec![1, 2, 3, 4]);
        let barrier = CostModel::default().barrier;
        assert_eq!(report.elapsed, 4 + barrier);
        assert_eq!(cluster.read(), report.elapsed);
    }

    #[test]
    fn test_fork_join_charges_setup() {
        let mut cluster = Cluster::new(ClusterConfig::default().with_total_cores(3)).unwrap();
        let report = cluster
            .fork_join(|core| Ok::<_, RuntimeError>(core.core_idx()))
            .unwrap();
        let cost = CostModel::default();
        assert_eq!(report.elapsed, cost.fork + cost.barrier);
        assert_eq!(report.value, vec![0, 1]);
    }

    #[test]
    fn test_region_error_propagates() {
        let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
        let err = cluster
            .run_spmd(|core| {
                // reading a never-written register fails on every core
                core.read_scalar(FpRegister::FA0)
            })
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UninitializedRegister(_)));
        assert_eq!(cluster.read(), 0);
    }

    #[test]
    fn test_run_single_uses_core_zero() {
        let mut cluster = Cluster::new(ClusterConfig::default()).unwrap();
        let addr = cluster.upload(MemoryTier::Main, &[4.0f32]).unwrap();
        let report = cluster
            .run_single(|core| {
                core.load(FpRegister::FA0, addr, FloatType::F32)?;
                Ok::<_, RuntimeError>((core.core_idx(), core.core_num()))
            })
            .unwrap();
        assert_eq!(report.value, (0, 1));
        assert_eq!(report.elapsed, CostModel::default().load_main);
    }
}
