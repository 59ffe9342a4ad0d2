//! Process-wide tracing setup shared by the curvebook binaries.

/// Initialize process-wide tracing with the default filter (`info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(tracing::DEFAULT_DIRECTIVE);
}

/// Tracing configuration (filters, formatter).
pub mod tracing;
