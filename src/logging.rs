//! Logging prelude for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("reconciliation pass starting");
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs at INFO and above by default. Control with `RUST_LOG`:
///
/// ```bash
/// RUST_LOG=debug zielen sync myprofile
/// RUST_LOG=zielen_core::coordinator=trace zielen sync myprofile
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
}

/// Initialize tracing with full backtraces on error events, for `--debug`.
pub fn init_tracing_debug() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
