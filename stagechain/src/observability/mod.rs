//! Observability utilities.

mod logging;

pub use logging::{init_tracing, LogFormat, SpanTimer, DEFAULT_LOG_FILTER};
