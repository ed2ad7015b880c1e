//! Monitor event notification.
//!
//! The GUI/webhook layers own the transport; the core only pushes
//! `(event, status)` pairs through this seam.

/// Sink for user-visible monitor events.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: &str, status: &str);
}

/// Discards everything. The default for headless runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: &str, _status: &str) {}
}
