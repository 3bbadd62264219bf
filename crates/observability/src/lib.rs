//! Process-wide tracing setup shared by the binaries.

/// Tracing configuration (filters, formatter).
pub mod tracing;

pub use self::tracing::LogFormat;

/// Initialize logging in `format`, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}
