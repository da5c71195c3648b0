//! Floating-point slice of the core's instruction set
//!
//! Only the part of the ISA that the streaming kernels touch is modelled:
//! the 32-entry FP register file with its RISC-V ABI names, the two float
//! widths, and the straight-line FP instructions that can be issued either
//! one by one or replayed by the FREP sequencer.

use serde::{Deserialize, Serialize};
use std::fmt;

// ================================================================================================
// Float Types
// ================================================================================================

/// Width of a floating-point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    /// Size in bytes
    pub const fn size_bytes(self) -> usize {
        match self {
            FloatType::F32 => 4,
            FloatType::F64 => 8,
        }
    }
}

impl fmt::Display for FloatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloatType::F32 => write!(f, "f32"),
            FloatType::F64 => write!(f, "f64"),
        }
    }
}

/// A typed floating-point value as held in an FP register
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FpValue {
    F32(f32),
    F64(f64),
}

impl FpValue {
    /// Width of this value
    pub const fn ty(self) -> FloatType {
        match self {
            FpValue::F32(_) => FloatType::F32,
            FpValue::F64(_) => FloatType::F64,
        }
    }

    /// Widen to f64 (lossless)
    pub fn to_f64(self) -> f64 {
        match self {
            FpValue::F32(v) => v as f64,
            FpValue::F64(v) => v,
        }
    }

    /// Build a value of the given width, rounding when narrowing to f32
    pub fn from_f64(ty: FloatType, value: f64) -> Self {
        match ty {
            FloatType::F32 => FpValue::F32(value as f32),
            FloatType::F64 => FpValue::F64(value),
        }
    }

    /// Quiet NaN of the given width
    pub fn poison(ty: FloatType) -> Self {
        Self::from_f64(ty, f64::NAN)
    }

    /// Apply a unary operation at this value's precision
    pub fn map(self, f32_op: impl FnOnce(f32) -> f32, f64_op: impl FnOnce(f64) -> f64) -> Self {
        match self {
            FpValue::F32(v) => FpValue::F32(f32_op(v)),
            FpValue::F64(v) => FpValue::F64(f64_op(v)),
        }
    }
}

impl fmt::Display for FpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FpValue::F32(v) => write!(f, "f32({})", v),
            FpValue::F64(v) => write!(f, "f64({})", v),
        }
    }
}

/// Host element type that can live in simulated memory and FP registers
pub trait Element: bytemuck::Pod + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Register width used for this element
    const TYPE: FloatType;

    fn into_value(self) -> FpValue;

    /// Narrowing conversion; a value of the other width is converted, not rejected
    fn from_value(value: FpValue) -> Self;

    fn to_f64(self) -> f64 {
        self.into_value().to_f64()
    }

    fn from_f64(value: f64) -> Self {
        Self::from_value(FpValue::from_f64(Self::TYPE, value))
    }
}

impl Element for f32 {
    const TYPE: FloatType = FloatType::F32;

    fn into_value(self) -> FpValue {
        FpValue::F32(self)
    }

    fn from_value(value: FpValue) -> Self {
        match value {
            FpValue::F32(v) => v,
            FpValue::F64(v) => v as f32,
        }
    }
}

impl Element for f64 {
    const TYPE: FloatType = FloatType::F64;

    fn into_value(self) -> FpValue {
        FpValue::F64(self)
    }

    fn from_value(value: FpValue) -> Self {
        value.to_f64()
    }
}

// ================================================================================================
// FP Registers
// ================================================================================================

/// Number of architectural FP registers
pub const FP_REGISTER_COUNT: usize = 32;

const ABI_NAMES: [&str; FP_REGISTER_COUNT] = [
    "ft0", "ft1", "ft2", "ft3", "ft4", "ft5", "ft6", "ft7", "fs0", "fs1", "fa0", "fa1", "fa2", "fa3", "fa4", "fa5",
    "fa6", "fa7", "fs2", "fs3", "fs4", "fs5", "fs6", "fs7", "fs8", "fs9", "fs10", "fs11", "ft8", "ft9", "ft10", "ft11",
];

/// Architectural FP register `f0`..`f31`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FpRegister(u8);

impl FpRegister {
    pub const FT0: Self = Self(0);
    pub const FT1: Self = Self(1);
    pub const FT2: Self = Self(2);
    pub const FT3: Self = Self(3);
    pub const FS0: Self = Self(8);
    pub const FA0: Self = Self(10);
    pub const FA1: Self = Self(11);
    pub const FA2: Self = Self(12);

    /// Register `f{index}`, or `None` past `f31`
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < FP_REGISTER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Architectural index
    pub const fn index(self) -> u8 {
        self.0
    }

    /// RISC-V ABI name (`ft0`, `fa0`, `fs2`, ...)
    pub fn abi_name(self) -> &'static str {
        ABI_NAMES[self.0 as usize]
    }

    /// Temporaries and argument registers are not preserved across calls.
    pub const fn is_caller_saved(self) -> bool {
        matches!(self.0, 0..=7 | 10..=17 | 28..=31)
    }

    /// All registers a callee may overwrite
    pub fn caller_saved() -> impl Iterator<Item = FpRegister> {
        (0..FP_REGISTER_COUNT as u8).map(FpRegister).filter(|r| r.is_caller_saved())
    }
}

impl fmt::Display for FpRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abi_name())
    }
}

// ================================================================================================
// FP Instructions
// ================================================================================================

/// Straight-line FP instruction
///
/// There is deliberately no call or branch variant: an `FpInstr` block is
/// exactly what the FREP sequencer is able to replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FpInstr {
    /// `fmv dst, src`
    Fmv { dst: FpRegister, src: FpRegister },
    /// `fneg dst, src`
    Fneg { dst: FpRegister, src: FpRegister },
    /// `fadd dst, lhs, rhs`
    Fadd { dst: FpRegister, lhs: FpRegister, rhs: FpRegister },
    /// `fsub dst, lhs, rhs`
    Fsub { dst: FpRegister, lhs: FpRegister, rhs: FpRegister },
    /// `fmul dst, lhs, rhs`
    Fmul { dst: FpRegister, lhs: FpRegister, rhs: FpRegister },
    /// `fdiv dst, lhs, rhs`
    Fdiv { dst: FpRegister, lhs: FpRegister, rhs: FpRegister },
    /// `fli dst, imm`
    Fli { dst: FpRegister, value: FpValue },
}

impl FpInstr {
    /// Mnemonic for logs
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            FpInstr::Fmv { .. } => "fmv",
            FpInstr::Fneg { .. } => "fneg",
            FpInstr::Fadd { .. } => "fadd",
            FpInstr::Fsub { .. } => "fsub",
            FpInstr::Fmul { .. } => "fmul",
            FpInstr::Fdiv { .. } => "fdiv",
            FpInstr::Fli { .. } => "fli",
        }
    }

    /// Destination register
    pub const fn dst(&self) -> FpRegister {
        match *self {
            FpInstr::Fmv { dst, .. }
            | FpInstr::Fneg { dst, .. }
            | FpInstr::Fadd { dst, .. }
            | FpInstr::Fsub { dst, .. }
            | FpInstr::Fmul { dst, .. }
            | FpInstr::Fdiv { dst, .. }
            | FpInstr::Fli { dst, .. } => dst,
        }
    }
}
