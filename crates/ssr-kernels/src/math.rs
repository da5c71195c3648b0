//! Foreign math routines called by the kernels
//!
//! These stand in for the accelerator's libm. Results are computed on the
//! host at the argument's precision, and each call is charged a fixed body
//! cost on top of the call overhead.

use ssr_runtime::{ForeignRoutine, FpValue};

/// Cycles charged for one `sinf` body
pub const SINF_CYCLES: u64 = 48;

/// Cycles charged for one `exp` body
pub const EXP_CYCLES: u64 = 64;

/// Single-precision sine
#[derive(Debug, Clone, Copy, Default)]
pub struct Sinf;

impl ForeignRoutine for Sinf {
    fn name(&self) -> &'static str {
        "sinf"
    }

    fn cycles(&self) -> u64 {
        SINF_CYCLES
    }

    fn eval(&self, arg: FpValue) -> FpValue {
        arg.map(f32::sin, f64::sin)
    }
}

/// Natural exponential
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl ForeignRoutine for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn cycles(&self) -> u64 {
        EXP_CYCLES
    }

    fn eval(&self, arg: FpValue) -> FpValue {
        arg.map(f32::exp, f64::exp)
    }
}

/// Host reference for the sigmoid kernels
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
