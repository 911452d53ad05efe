//! Telemetry and logging infrastructure
//!
//! Structured logging with tracing plus frame pipeline counters.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{PipelineCounters, ProcessingProfiler, ProcessingStats};

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
