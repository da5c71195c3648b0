//! Performance-focused tracing utilities
//!
//! Wall-clock spans with threshold filtering, plus structured events for the
//! simulated cycle counts that the benchmark harness produces.
//!
//! ## Example
//!
//! ```rust
//! use ssr_tracing::performance::{PerformanceSpan, record_cycles};
//!
//! let span = PerformanceSpan::new("sin_ssr", Some(100));
//! // ... run the kernel ...
//! drop(span); // Logs only if duration > 100μs
//!
//! record_cycles("sin", "ssr", 1024, 48_211);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::Level;

/// Process-wide default threshold. Zero logs every span.
static DEFAULT_THRESHOLD_US: AtomicU64 = AtomicU64::new(0);

/// Set the threshold used by spans created without an explicit one.
pub fn set_threshold_us(threshold_us: Option<u64>) {
    DEFAULT_THRESHOLD_US.store(threshold_us.unwrap_or(0), Ordering::Relaxed);
}

/// Threshold used by spans created without an explicit one.
pub fn threshold_us() -> Option<u64> {
    match DEFAULT_THRESHOLD_US.load(Ordering::Relaxed) {
        0 => None,
        t => Some(t),
    }
}

/// RAII guard that measures span duration and conditionally logs based on threshold.
///
/// # Example
///
/// ```rust
/// use ssr_tracing::performance::PerformanceSpan;
///
/// {
///     let _span = PerformanceSpan::new("benchmark_run", Some(1000));
///     // ... harness code ...
/// } // Span logged only if duration > 1000μs
/// ```
pub struct PerformanceSpan {
    name: String,
    threshold_us: Option<u64>,
    start_time: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// Create a new performance span. `None` falls back to the process-wide
    /// threshold installed by [`crate::init_global_tracing`].
    pub fn new(span_name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        Self::with_level(Level::DEBUG, span_name, threshold_us)
    }

    /// Create a new performance span at the specified tracing level.
    pub fn with_level(level: Level, span_name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let name = span_name.into();
        let span = match level {
            Level::TRACE => tracing::trace_span!("perf", name = %name),
            Level::DEBUG => tracing::debug_span!("perf", name = %name),
            Level::INFO => tracing::info_span!("perf", name = %name),
            Level::WARN => tracing::warn_span!("perf", name = %name),
            Level::ERROR => tracing::error_span!("perf", name = %name),
        };

        Self {
            name,
            threshold_us: threshold_us.or_else(threshold_us_default),
            start_time: Instant::now(),
            span,
        }
    }

    /// Name this span was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elapsed wall-clock time since creation, in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }

    /// Elapsed wall-clock time since creation, in nanoseconds.
    pub fn elapsed_ns(&self) -> u64 {
        self.start_time.elapsed().as_nanos() as u64
    }

    /// Enter this span's context.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

fn threshold_us_default() -> Option<u64> {
    threshold_us()
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();

        if self.threshold_us.is_none_or(|t| elapsed_us >= t) {
            let _entered = self.span.enter();
            tracing::debug!(
                duration_us = elapsed_us,
                duration_ms = elapsed_us as f64 / 1000.0,
                "performance_span_complete"
            );
        }
    }
}

/// Record the simulated cycle count of one kernel variant run.
pub fn record_cycles(kernel: &str, variant: &str, elements: usize, cycles: u64) {
    let cycles_per_element = if elements > 0 {
        cycles as f64 / elements as f64
    } else {
        0.0
    };

    tracing::debug!(
        event = "cycles",
        kernel = kernel,
        variant = variant,
        elements = elements,
        cycles = cycles,
        cycles_per_element = cycles_per_element,
        "kernel_cycles"
    );
}

/// Record an operation throughput event measured in wall-clock time.
pub fn record_throughput(operation: &str, elements: usize, duration_us: u64) {
    let elements_per_sec = if duration_us > 0 {
        (elements as f64 / duration_us as f64) * 1_000_000.0
    } else {
        0.0
    };

    tracing::debug!(
        event = "throughput",
        operation = operation,
        elements = elements,
        duration_us = duration_us,
        elements_per_sec = elements_per_sec,
        "operation_throughput"
    );
}
