/*!
 * Monitoring
 * Structured logging and native call tracing
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, NativeCallSpan, SLOW_CALL_THRESHOLD};
