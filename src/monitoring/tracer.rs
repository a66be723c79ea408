/*!
 * Tracing
 * Structured tracing for native calls using the tracing crate
 *
 * Features:
 * - Per-call trace IDs for correlating a native call with its callbacks
 * - JSON-formatted logs for structured parsing
 * - Slow native call warnings
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Native calls slower than this are logged at warn level
pub const SLOW_CALL_THRESHOLD: Duration = Duration::from_millis(250);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - VIX_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("VIX_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        let installed = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok();
        if installed {
            info!("Structured tracing initialized with JSON output");
        }
    } else {
        let installed = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
            .is_ok();
        if installed {
            info!("Structured tracing initialized");
        }
    }
}

/// Generate a unique trace ID
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one blocking native call
///
/// Entered only while the execution lock is released. Duration is recorded
/// when the span is dropped.
pub struct NativeCallSpan {
    span: tracing::Span,
    start: Instant,
    op: &'static str,
    trace_id: String,
}

impl NativeCallSpan {
    pub fn new(op: &'static str) -> Self {
        let trace_id = generate_trace_id();
        let span = span!(
            Level::DEBUG,
            "native_call",
            trace_id = %trace_id,
            op = op,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            op,
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Run `f` inside the span
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        self.span.in_scope(f)
    }
}

impl Drop for NativeCallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.span.record("duration_us", duration_us);
        let _entered = self.span.enter();

        if duration > SLOW_CALL_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                op = self.op,
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                slow = true,
                "slow native call"
            );
        } else {
            debug!(op = self.op, duration_us, "native call completed");
        }
    }
}
