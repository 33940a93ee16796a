//! Runtime events for monitoring live sessions.
//!
//! Events are non-fatal notifications about session behavior. Errors that
//! originate inside a real-time audio callback cannot propagate as `Result`s
//! (the OS audio layer's contract disallows unwinding through the callback),
//! so they are surfaced here instead.

use std::path::PathBuf;
use std::sync::Arc;

/// Runtime events emitted during capture.
///
/// These are delivered via the callback registered with
/// [`CaptureBuilder::on_event()`]. The poller-facing accessors
/// (`input_level`, `is_running`) stay authoritative; events exist for
/// logging and one-shot warnings.
///
/// [`CaptureBuilder::on_event()`]: crate::CaptureBuilder::on_event
#[derive(Debug, Clone)]
pub enum BoothEvent {
    /// The take buffer reached its capacity bound.
    ///
    /// Further chunks are dropped (drop-newest). Emitted exactly once per
    /// capture session, not once per dropped chunk.
    CaptureOverflow {
        /// The capacity bound that was reached, in seconds.
        capacity_secs: u64,
    },

    /// The audio stream reported a runtime error.
    ///
    /// The owning session transitions to stopped; the operation is not
    /// retried. A fresh `start()` is required afterwards.
    StreamError {
        /// Description of the error.
        reason: String,
    },

    /// The capture deadline expired and the session stopped itself.
    ///
    /// If any audio was buffered it has already been persisted to `path`;
    /// `None` means nothing was recorded before the deadline.
    CaptureAutoStopped {
        /// Where the take was written, if anything was captured.
        path: Option<PathBuf>,
    },
}

/// Callback type for receiving runtime events.
///
/// # Example
///
/// ```ignore
/// let session = CaptureSession::builder()
///     .on_event(|event| tracing::warn!(?event, "capture event"))
///     .start()
///     .await?;
/// ```
pub type EventCallback = Arc<dyn Fn(BoothEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// Convenience for creating event callbacks without manually wrapping in
/// `Arc`.
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(BoothEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_debug() {
        let event = BoothEvent::CaptureOverflow { capacity_secs: 600 };
        let debug = format!("{:?}", event);
        assert!(debug.contains("CaptureOverflow"));
        assert!(debug.contains("600"));
    }

    #[test]
    fn test_event_clone() {
        let event = BoothEvent::StreamError {
            reason: "device disconnected".to_string(),
        };
        let cloned = event.clone();
        if let BoothEvent::StreamError { reason } = cloned {
            assert_eq!(reason, "device disconnected");
        } else {
            panic!("Expected StreamError variant");
        }
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(BoothEvent::CaptureAutoStopped { path: None });
        assert!(called.load(Ordering::SeqCst));
    }
}
