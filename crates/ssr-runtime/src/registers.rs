//! FP register file of a single core
//!
//! Tracks, per register, whether it holds a typed value, was never written,
//! or was overwritten by a foreign routine and may hold anything. Stream
//! redirection of `ft0`/`ft1` is handled one level up in the core; this file
//! only ever sees the architectural contents.

use crate::isa::{FloatType, FpRegister, FpValue, FP_REGISTER_COUNT};

// ================================================================================================
// Register Value Storage
// ================================================================================================

/// Architectural contents of one FP register
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterValue {
    Value(FpValue),
    /// Overwritten by a callee; the contents are unspecified but keep the
    /// width of the last value
    Clobbered(FloatType),
    Uninitialized,
}

// ================================================================================================
// Register File
// ================================================================================================

/// The 32 FP registers of a core
#[derive(Debug, Clone)]
pub struct FpRegisterFile {
    registers: [RegisterValue; FP_REGISTER_COUNT],
}

impl Default for FpRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl FpRegisterFile {
    /// All registers uninitialized
    pub fn new() -> Self {
        Self {
            registers: [RegisterValue::Uninitialized; FP_REGISTER_COUNT],
        }
    }

    pub fn get(&self, reg: FpRegister) -> RegisterValue {
        self.registers[reg.index() as usize]
    }

    pub fn set(&mut self, reg: FpRegister, value: FpValue) {
        self.registers[reg.index() as usize] = RegisterValue::Value(value);
    }

    /// Mark every caller-saved register except `keep` as clobbered
    pub fn clobber_caller_saved(&mut self, keep: FpRegister) {
        for reg in FpRegister::caller_saved().filter(|r| *r != keep) {
            let slot = &mut self.registers[reg.index() as usize];
            let width = match *slot {
                RegisterValue::Value(v) => v.ty(),
                RegisterValue::Clobbered(ty) => ty,
                RegisterValue::Uninitialized => FloatType::F64,
            };
            *slot = RegisterValue::Clobbered(width);
        }
    }

    pub fn is_initialized(&self, reg: FpRegister) -> bool {
        matches!(self.get(reg), RegisterValue::Value(_))
    }
}
