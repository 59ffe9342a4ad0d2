//! Tracing/logging initialization.
//!
//! Logs are emitted as JSON lines with timestamps. `RUST_LOG` overrides the
//! fallback directive, e.g. `RUST_LOG=curvebook_infra=debug`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Resolve the filter: `RUST_LOG` first, then `fallback`.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the JSON subscriber.
///
/// Returns `false` when a global subscriber was already installed (by an
/// earlier call or by a test harness); the existing one stays in place.
pub fn init(fallback: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .with_current_span(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        let _ = init(DEFAULT_DIRECTIVE);
        assert!(!init("debug"));
    }

    #[test]
    fn fallback_directive_parses() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
    }
}
