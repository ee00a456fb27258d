//! Cancellation utilities.
//!
//! This module provides:
//! - CancellationToken for cooperative cancellation
//! - RunContext binding a token and a deadline to one pipeline run

mod run_context;
mod token;

pub use run_context::{Interruption, RunContext};
pub use token::{CancelCallback, CancellationToken};
