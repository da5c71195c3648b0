//! Execution context of one compute core
//!
//! A [`CoreContext`] owns everything private to a core (FP registers, the two
//! stream data movers, the `mcycle` counter) and a shared handle to cluster
//! memory. All FP register traffic goes through [`CoreContext::exec`],
//! [`CoreContext::load`] and [`CoreContext::store`] so that accesses to
//! `ft0`/`ft1` are redirected to the streams whenever redirection is enabled.

use crate::cycles::{CostModel, CycleCounter, CycleSource, LOOP_CONTROL_OPS, STREAM_CONFIG_WRITES};
use crate::error::{ProtocolViolation, Result, RuntimeError};
use crate::isa::{FloatType, FpInstr, FpRegister, FpValue};
use crate::memory::{Address, MemoryManager};
use crate::registers::{FpRegisterFile, RegisterValue};
use crate::stream::{AddressGenerator, DataMover, StreamDescriptor, StreamDirection};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How protocol violations are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolCheck {
    /// Fail at the offending operation
    #[default]
    Strict,
    /// Record the violation and carry on with hardware behaviour
    Permissive,
}

/// Private state of one compute core
#[derive(Debug)]
pub struct CoreContext {
    core_idx: usize,
    core_num: usize,
    registers: FpRegisterFile,
    generators: [Option<AddressGenerator>; 2],
    streaming: bool,
    cycles: CycleCounter,
    memory: Arc<RwLock<MemoryManager>>,
    cost: CostModel,
    check: ProtocolCheck,
    violations: Vec<ProtocolViolation>,
}

impl CoreContext {
    /// Core `core_idx` of a group of `core_num` compute cores
    pub fn new(
        core_idx: usize,
        core_num: usize,
        memory: Arc<RwLock<MemoryManager>>,
        cost: CostModel,
        check: ProtocolCheck,
    ) -> Self {
        Self {
            core_idx,
            core_num,
            registers: FpRegisterFile::new(),
            generators: [None, None],
            streaming: false,
            cycles: CycleCounter::new(),
            memory,
            cost,
            check,
            violations: Vec::new(),
        }
    }

    /// Index of this core among the compute cores
    pub fn core_idx(&self) -> usize {
        self.core_idx
    }

    /// Number of compute cores sharing the current work
    pub fn core_num(&self) -> usize {
        self.core_num
    }

    /// Current `mcycle` value
    pub fn cycles(&self) -> u64 {
        self.cycles.read()
    }

    pub fn cycle_counter(&self) -> &CycleCounter {
        &self.cycles
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    pub fn protocol_check(&self) -> ProtocolCheck {
        self.check
    }

    pub fn memory(&self) -> &Arc<RwLock<MemoryManager>> {
        &self.memory
    }

    /// Violations recorded under [`ProtocolCheck::Permissive`]
    pub fn violations(&self) -> &[ProtocolViolation] {
        &self.violations
    }

    pub fn take_violations(&mut self) -> Vec<ProtocolViolation> {
        std::mem::take(&mut self.violations)
    }

    /// Whether `ft0`/`ft1` are currently redirected to the streams
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Live generator of a data mover, if one is configured
    pub fn generator(&self, dm: DataMover) -> Option<&AddressGenerator> {
        self.generators[dm.index()].as_ref()
    }

    // ============================================================================================
    // Scalar Instructions
    // ============================================================================================

    /// Charge `count` integer instructions
    pub fn int_ops(&mut self, count: u64) {
        self.charge(count * self.cost.int_op);
    }

    /// Charge the back-edge of one loop iteration
    pub fn loop_control(&mut self) {
        self.int_ops(LOOP_CONTROL_OPS);
    }

    /// `flw`/`fld dst, addr`
    pub fn load(&mut self, dst: FpRegister, addr: Address, ty: FloatType) -> Result<()> {
        let (value, tier) = {
            let mem = self.memory.read();
            (read_value(&mem, addr, ty)?, mem.tier(addr.buffer)?)
        };
        self.charge(self.cost.load(tier));
        self.write_operand(dst, value)
    }

    /// `fsw`/`fsd src, addr` at the width of the value held in `src`
    pub fn store(&mut self, src: FpRegister, addr: Address) -> Result<()> {
        let value = self.read_operand(src)?;
        let tier = {
            let mut mem = self.memory.write();
            write_value(&mut mem, addr, value)?;
            mem.tier(addr.buffer)?
        };
        self.charge(self.cost.store(tier));
        Ok(())
    }

    /// Move an FP register to the integer side (`fmv.x`/`fcvt`)
    pub fn read_scalar(&mut self, src: FpRegister) -> Result<f64> {
        let value = self.read_operand(src)?;
        self.charge(self.cost.fp_op);
        Ok(value.to_f64())
    }

    /// Issue one FP instruction
    pub fn exec(&mut self, instr: FpInstr) -> Result<()> {
        let value = match instr {
            FpInstr::Fmv { src, .. } => self.read_operand(src)?,
            FpInstr::Fneg { src, .. } => self.read_operand(src)?.map(|v| -v, |v| -v),
            FpInstr::Fadd { lhs, rhs, .. } => self.binary(lhs, rhs, |a, b| a + b, |a, b| a + b)?,
            FpInstr::Fsub { lhs, rhs, .. } => self.binary(lhs, rhs, |a, b| a - b, |a, b| a - b)?,
            FpInstr::Fmul { lhs, rhs, .. } => self.binary(lhs, rhs, |a, b| a * b, |a, b| a * b)?,
            FpInstr::Fdiv { lhs, rhs, .. } => self.binary(lhs, rhs, |a, b| a / b, |a, b| a / b)?,
            FpInstr::Fli { value, .. } => value,
        };
        self.charge(self.cost.fp_op);
        self.write_operand(instr.dst(), value)
    }

    fn binary(
        &mut self,
        lhs: FpRegister,
        rhs: FpRegister,
        f32_op: fn(f32, f32) -> f32,
        f64_op: fn(f64, f64) -> f64,
    ) -> Result<FpValue> {
        let a = self.read_operand(lhs)?;
        let b = self.read_operand(rhs)?;
        match (a, b) {
            (FpValue::F32(x), FpValue::F32(y)) => Ok(FpValue::F32(f32_op(x, y))),
            (FpValue::F64(x), FpValue::F64(y)) => Ok(FpValue::F64(f64_op(x, y))),
            _ => Err(RuntimeError::TypeMismatch {
                expected: a.ty(),
                actual: b.ty(),
            }),
        }
    }

    // ============================================================================================
    // Register Access With Stream Redirection
    // ============================================================================================

    pub(crate) fn read_operand(&mut self, reg: FpRegister) -> Result<FpValue> {
        if let Some(dm) = self.bound_mover(reg) {
            if self.streaming {
                return self.stream_pop(dm);
            }
            self.check_disabled_access(reg, dm)?;
        }
        self.read_architectural(reg)
    }

    pub(crate) fn write_operand(&mut self, reg: FpRegister, value: FpValue) -> Result<()> {
        if let Some(dm) = self.bound_mover(reg) {
            if self.streaming {
                return self.stream_push(dm, value);
            }
            self.check_disabled_access(reg, dm)?;
        }
        self.registers.set(reg, value);
        Ok(())
    }

    /// Data mover configured behind `reg`, if any
    fn bound_mover(&self, reg: FpRegister) -> Option<DataMover> {
        DataMover::for_register(reg).filter(|dm| self.generators[dm.index()].is_some())
    }

    fn check_disabled_access(&mut self, reg: FpRegister, dm: DataMover) -> Result<()> {
        let armed = self.generators[dm.index()]
            .as_ref()
            .is_some_and(|gen| !gen.is_exhausted());
        if armed {
            self.violate(ProtocolViolation::RegisterWhileDisabled { register: reg, dm })?;
        }
        Ok(())
    }

    /// Register contents ignoring any stream binding
    pub(crate) fn read_architectural(&mut self, reg: FpRegister) -> Result<FpValue> {
        match self.registers.get(reg) {
            RegisterValue::Value(v) => Ok(v),
            RegisterValue::Uninitialized => Err(RuntimeError::UninitializedRegister(reg)),
            RegisterValue::Clobbered(ty) => {
                self.violate(ProtocolViolation::ClobberedRead { register: reg })?;
                Ok(FpValue::poison(ty))
            }
        }
    }

    pub(crate) fn registers_mut(&mut self) -> &mut FpRegisterFile {
        &mut self.registers
    }

    pub(crate) fn stream_pop(&mut self, dm: DataMover) -> Result<FpValue> {
        let (addr, ty) = self.stream_advance(dm, StreamDirection::Read)?;
        let (value, tier) = {
            let mem = self.memory.read();
            (read_value(&mem, addr, ty)?, mem.tier(addr.buffer)?)
        };
        self.charge(self.cost.stream(tier));
        Ok(value)
    }

    pub(crate) fn stream_push(&mut self, dm: DataMover, value: FpValue) -> Result<()> {
        let (addr, ty) = self.stream_advance(dm, StreamDirection::Write)?;
        if value.ty() != ty {
            return Err(RuntimeError::TypeMismatch {
                expected: ty,
                actual: value.ty(),
            });
        }
        let tier = {
            let mut mem = self.memory.write();
            write_value(&mut mem, addr, value)?;
            mem.tier(addr.buffer)?
        };
        self.charge(self.cost.stream(tier));
        Ok(())
    }

    fn stream_advance(&mut self, dm: DataMover, expected: StreamDirection) -> Result<(Address, FloatType)> {
        let (direction, exhausted) = match &self.generators[dm.index()] {
            Some(gen) => (gen.direction(), gen.is_exhausted()),
            None => return Err(RuntimeError::invalid_descriptor(format!("{dm} is not configured"))),
        };
        if direction != expected {
            self.violate(ProtocolViolation::DirectionMismatch {
                register: dm.register(),
                dm,
            })?;
        }
        if exhausted {
            self.violate(ProtocolViolation::StreamExhausted { dm })?;
        }
        match &mut self.generators[dm.index()] {
            Some(gen) => Ok((gen.next_address(), gen.descriptor().element())),
            None => Err(RuntimeError::invalid_descriptor(format!("{dm} is not configured"))),
        }
    }

    // ============================================================================================
    // Stream Unit Control
    // ============================================================================================

    /// Write a descriptor into a data mover's configuration registers
    pub(crate) fn configure_stream(&mut self, dm: DataMover, descriptor: StreamDescriptor) -> Result<()> {
        let generator = AddressGenerator::new(descriptor)?;
        if let Some(previous) = &self.generators[dm.index()] {
            let remaining = previous.remaining();
            if remaining > 0 {
                self.violate(ProtocolViolation::GeneratorStillArmed { dm, remaining })?;
            }
        }
        self.charge(STREAM_CONFIG_WRITES * self.cost.csr_write);
        self.generators[dm.index()] = Some(generator);
        tracing::trace!(core = self.core_idx, %dm, accesses = descriptor.total_accesses(), "stream configured");
        Ok(())
    }

    pub(crate) fn set_streaming(&mut self, enabled: bool) {
        self.charge(self.cost.csr_write);
        self.streaming = enabled;
    }

    pub(crate) fn has_generator(&self) -> bool {
        self.generators.iter().any(Option::is_some)
    }

    /// Accesses issued so far by each configured data mover
    pub(crate) fn issued_counts(&self) -> [Option<u64>; 2] {
        [
            self.generators[0].as_ref().map(AddressGenerator::issued),
            self.generators[1].as_ref().map(AddressGenerator::issued),
        ]
    }

    /// Drop exhausted generators; return the ones still holding accesses
    pub(crate) fn release_generators(&mut self) -> Vec<(DataMover, u64)> {
        let mut armed = Vec::new();
        for dm in DataMover::ALL {
            match &self.generators[dm.index()] {
                Some(gen) if !gen.is_exhausted() => armed.push((dm, gen.remaining())),
                Some(_) => self.generators[dm.index()] = None,
                None => {}
            }
        }
        armed
    }

    // ============================================================================================
    // Accounting
    // ============================================================================================

    pub(crate) fn charge(&mut self, cycles: u64) {
        self.cycles.advance(cycles);
    }

    /// Fail (strict) or record (permissive) a protocol violation
    pub(crate) fn violate(&mut self, violation: ProtocolViolation) -> Result<()> {
        match self.check {
            ProtocolCheck::Strict => Err(violation.into()),
            ProtocolCheck::Permissive => {
                self.record(violation);
                Ok(())
            }
        }
    }

    /// Record a violation regardless of the check mode
    pub(crate) fn record(&mut self, violation: ProtocolViolation) {
        tracing::warn!(core = self.core_idx, %violation, "ssr protocol violation");
        self.violations.push(violation);
    }
}

fn read_value(mem: &MemoryManager, addr: Address, ty: FloatType) -> Result<FpValue> {
    Ok(match ty {
        FloatType::F32 => FpValue::F32(mem.read::<f32>(addr)?),
        FloatType::F64 => FpValue::F64(mem.read::<f64>(addr)?),
    })
}

fn write_value(mem: &mut MemoryManager, addr: Address, value: FpValue) -> Result<()> {
    match value {
        FpValue::F32(v) => mem.write(addr, v),
        FpValue::F64(v) => mem.write(addr, v),
    }
}
