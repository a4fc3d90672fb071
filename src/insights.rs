//! Insights - Observability for ringflight.
//!
//! Structured logging through `tracing`. The library only emits events and
//! spans; binaries decide where they go.
//!
//! # Usage
//!
//! ```rust,ignore
//! ringflight::init_logging(1)?; // debug for ringflight, RUST_LOG overrides
//! ```
//!
//! Per-request spans (`submit`, `await`) are emitted at TRACE level so they
//! cost nothing unless a subscriber asks for them.

use tracing::span::EnteredSpan;
use tracing_subscriber::EnvFilter;

use crate::error::{ Result, RingflightError };

/// Install a fmt subscriber (call once at startup).
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks the ringflight
/// level: 0 = info, 1 = debug, 2+ = trace.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "ringflight=info",
        1 => "ringflight=debug",
        _ => "ringflight=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| RingflightError::runtime(format!("logging already initialised: {e}")))
}

/// Span covering one non-blocking submission
#[inline]
pub fn submit_span(slot: usize) -> EnteredSpan {
    tracing::trace_span!("submit", slot).entered()
}

/// Span covering one blocking wait
#[inline]
pub fn await_span(slot: usize) -> EnteredSpan {
    tracing::trace_span!("await", slot).entered()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_without_subscriber() {
        // No subscriber installed: spans are disabled but must still be usable
        let s = submit_span(0);
        drop(s);
        let _a = await_span(1);
    }
}
