//! Kernel and variant identifiers
//!
//! Names follow the `<kernel>_<variant>` convention used in the result logs,
//! e.g. `sin_ssr_parallel`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use ssr_runtime::FloatType;
use std::fmt;
use std::str::FromStr;

/// Element-wise function under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// `sinf` over `f32`
    Sin,
    /// `1 / (1 + exp(-x))` over `f64`
    Sigmoid,
    /// Identity over `f32`, used for the memory-tier comparison
    Copy,
}

impl Kernel {
    pub const ALL: [Kernel; 3] = [Kernel::Sin, Kernel::Sigmoid, Kernel::Copy];

    pub const fn name(self) -> &'static str {
        match self {
            Kernel::Sin => "sin",
            Kernel::Sigmoid => "sigmoid",
            Kernel::Copy => "copy",
        }
    }

    /// Element type of the input and output vectors
    pub const fn element_type(self) -> FloatType {
        match self {
            Kernel::Sin | Kernel::Copy => FloatType::F32,
            Kernel::Sigmoid => FloatType::F64,
        }
    }

    /// Variants defined for this kernel
    pub fn variants(self) -> &'static [Variant] {
        use Variant::*;
        match self {
            Kernel::Sin => &Variant::ALL,
            Kernel::Sigmoid => &[Baseline, Ssr, SsrFrep, Parallel, SsrParallel, SsrOmp],
            Kernel::Copy => &[Baseline, Ssr, SsrFrep],
        }
    }

    pub fn supports(self, variant: Variant) -> bool {
        self.variants().contains(&variant)
    }

    /// Fail with [`Error::UnsupportedVariant`] unless `variant` is defined
    pub fn ensure_supported(self, variant: Variant) -> Result<()> {
        if self.supports(variant) {
            Ok(())
        } else {
            Err(Error::UnsupportedVariant { kernel: self, variant })
        }
    }
}

/// Implementation strategy of a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Baseline,
    Ssr,
    SsrFrep,
    LookupTable,
    SsrLookupTable,
    Parallel,
    SsrParallel,
    Omp,
    SsrOmp,
}

impl Variant {
    pub const ALL: [Variant; 9] = [
        Variant::Baseline,
        Variant::Ssr,
        Variant::SsrFrep,
        Variant::LookupTable,
        Variant::SsrLookupTable,
        Variant::Parallel,
        Variant::SsrParallel,
        Variant::Omp,
        Variant::SsrOmp,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Variant::Baseline => "baseline",
            Variant::Ssr => "ssr",
            Variant::SsrFrep => "ssr_frep",
            Variant::LookupTable => "lookup_table",
            Variant::SsrLookupTable => "ssr_lookup_table",
            Variant::Parallel => "parallel",
            Variant::SsrParallel => "ssr_parallel",
            Variant::Omp => "omp",
            Variant::SsrOmp => "ssr_omp",
        }
    }

    /// How the variant spreads work over the cluster
    pub const fn parallelism(self) -> Parallelism {
        match self {
            Variant::Parallel | Variant::SsrParallel => Parallelism::Spmd,
            Variant::Omp | Variant::SsrOmp => Parallelism::ForkJoin,
            _ => Parallelism::Single,
        }
    }

    /// Per-core optimization applied
    pub const fn optimization(self) -> Optimization {
        match self {
            Variant::Baseline | Variant::Parallel | Variant::Omp => Optimization::Scalar,
            Variant::Ssr | Variant::SsrParallel | Variant::SsrOmp => Optimization::Ssr,
            Variant::SsrFrep => Optimization::SsrFrep,
            Variant::LookupTable => Optimization::LookupTable,
            Variant::SsrLookupTable => Optimization::SsrLookupTable,
        }
    }

    pub const fn is_parallel(self) -> bool {
        !matches!(self.parallelism(), Parallelism::Single)
    }

    pub const fn uses_lookup_table(self) -> bool {
        matches!(self, Variant::LookupTable | Variant::SsrLookupTable)
    }
}

/// Work distribution of a variant, the x-axis of the speedup plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// Core 0 only
    Single,
    /// Every compute core runs the same code on its own partition
    Spmd,
    /// SPMD entered through a fork-join region
    ForkJoin,
}

/// Per-core strategy of a variant, the hue of the speedup plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimization {
    Scalar,
    Ssr,
    SsrFrep,
    LookupTable,
    SsrLookupTable,
}

/// What FREP did for a run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepeatFolding {
    /// The variant does not use the sequencer
    #[default]
    NotUsed,
    /// The loop body was replayed by the sequencer
    Folded { iterations: usize },
    /// The body cannot be folded; output is that of the plain streaming loop
    NotApplicable { reason: String },
}

macro_rules! display_and_parse {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $ty::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == s.trim())
                    .ok_or_else(|| Error::invalid_config(format!("unknown {} '{}'", $what, s)))
            }
        }
    };
}

display_and_parse!(Kernel, "kernel");
display_and_parse!(Variant, "variant");

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parallelism::Single => "single",
            Parallelism::Spmd => "spmd",
            Parallelism::ForkJoin => "fork_join",
        })
    }
}

impl fmt::Display for Optimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Optimization::Scalar => "scalar",
            Optimization::Ssr => "ssr",
            Optimization::SsrFrep => "ssr_frep",
            Optimization::LookupTable => "lookup_table",
            Optimization::SsrLookupTable => "ssr_lookup_table",
        })
    }
}
