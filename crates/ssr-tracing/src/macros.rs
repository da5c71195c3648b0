//! Convenience macros for performance tracing

/// Create a performance span with automatic field capture.
///
/// ```rust
/// use ssr_tracing::perf_span;
///
/// {
///     let _span = perf_span!("sin_ssr", n = 1024, cores = 1);
///     // ... kernel ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        let _span = tracing::debug_span!(
            "perf",
            name = $name,
            $($field = $value),+
        ).entered();
        $crate::performance::PerformanceSpan::new($name, None)
    }};
}

/// Emit a standardized performance event at debug level.
///
/// ```rust
/// use ssr_tracing::perf_event;
///
/// perf_event!("session_closed", consumed = 1024, produced = 1024);
/// ```
#[macro_export]
macro_rules! perf_event {
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {
        tracing::debug!(
            event = $name,
            $($field = $value),+
        );
    };
}

/// Execute a block and return `(result, duration_us)`.
///
/// ```rust
/// use ssr_tracing::timed_block;
///
/// let (sum, _duration_us) = timed_block!("sum", { (1..=100).sum::<i32>() });
/// assert_eq!(sum, 5050);
/// ```
#[macro_export]
macro_rules! timed_block {
    ($name:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration_us = start.elapsed().as_micros() as u64;
        tracing::debug!(operation = $name, duration_us = duration_us, "timed_block_complete");
        (result, duration_us)
    }};
}
