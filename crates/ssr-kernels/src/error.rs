//! Error types for kernel and harness operations

use crate::variant::{Kernel, Variant};

/// Result type for kernel and harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning, running or reporting a benchmark
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Simulator error, including protocol violations
    #[error(transparent)]
    Runtime(#[from] ssr_runtime::RuntimeError),

    /// Partition plan rejected
    #[error("Partition error: {0}")]
    Partition(String),

    /// Lookup table input outside one period
    #[error("Lookup input {value} outside [0, 2π) for a table of {size} entries")]
    LookupOutOfRange { value: f64, size: usize },

    /// Lookup table size rejected
    #[error("Invalid lookup table size: {0}")]
    InvalidTableSize(usize),

    /// Kernel has no such variant
    #[error("Unsupported variant: {kernel} has no {variant} variant")]
    UnsupportedVariant { kernel: Kernel, variant: Variant },

    /// Benchmark configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Report or configuration (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing a report failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a partition error
    pub fn partition(msg: impl Into<String>) -> Self {
        Self::Partition(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Protocol violation carried by a runtime error, if any
    pub fn violation(&self) -> Option<ssr_runtime::ProtocolViolation> {
        match self {
            Error::Runtime(err) => err.violation(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_converts() {
        let err: Error = ssr_runtime::RuntimeError::invalid_config("no cores").into();
        assert!(matches!(err, Error::Runtime(_)));
        assert_eq!(err.to_string(), "invalid cluster configuration: no cores");
    }

    #[test]
    fn test_unsupported_variant_display() {
        let err = Error::UnsupportedVariant {
            kernel: Kernel::Copy,
            variant: Variant::LookupTable,
        };
        assert_eq!(err.to_string(), "Unsupported variant: copy has no lookup_table variant");
    }
}
