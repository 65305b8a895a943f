//! Textual status updates emitted toward the UI layer.
//!
//! Every state transition in the core produces a [`StatusUpdate`].
//! Delivery is fire-and-forget over a bounded channel: if the consumer is
//! slow or gone, updates are dropped rather than ever blocking an engine or
//! the dispatcher.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// StatusUpdate
// ---------------------------------------------------------------------------

/// A state transition notification for display.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Nothing is running and no key is held.
    Idle,
    /// The repeat loop is active (normal mode).
    Running,
    /// The target key is held down (hold mode).
    Holding,
    /// A stop was requested; the repeat loop is winding down.
    Stopping,
    /// A start was requested while the repeat loop was already active.
    /// Informational, not an error.
    AlreadyRunning,
    /// The emergency-stop key forced everything back to idle.
    EmergencyStop,
    /// The configured interval is below the safety floor and needs explicit
    /// operator confirmation before the repeat loop may start.
    ConfirmSubMinimum { interval: Duration },
    /// Something failed; the core has already cleaned up its own state.
    Error(String),
}

impl StatusUpdate {
    /// Short display label for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            StatusUpdate::Idle => "Idle",
            StatusUpdate::Running => "Running (Normal)",
            StatusUpdate::Holding => "Holding (Toggle)",
            StatusUpdate::Stopping => "Stopping...",
            StatusUpdate::AlreadyRunning => "Already Running",
            StatusUpdate::EmergencyStop => "Emergency Stop",
            StatusUpdate::ConfirmSubMinimum { .. } => "Confirmation Required",
            StatusUpdate::Error(_) => "Error",
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::Error(msg) => write!(f, "Error: {msg}"),
            StatusUpdate::ConfirmSubMinimum { interval } => write!(
                f,
                "Interval {} ms is below the safety floor and requires confirmation",
                interval.as_millis()
            ),
            other => f.write_str(other.label()),
        }
    }
}

// ---------------------------------------------------------------------------
// StatusSender
// ---------------------------------------------------------------------------

/// Fire-and-forget sender half of the status surface.
///
/// Cheap to clone.  [`StatusSender::disabled`] produces a sender that drops
/// everything — convenient in tests that do not observe status.
#[derive(Clone)]
pub struct StatusSender {
    tx: Option<mpsc::Sender<StatusUpdate>>,
}

impl StatusSender {
    pub fn new(tx: mpsc::Sender<StatusUpdate>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sender with no channel behind it; every update is discarded.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Send `update` without blocking.  Loss-tolerant by design: a full or
    /// closed channel only produces a debug log line.
    pub fn send(&self, update: StatusUpdate) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.try_send(update) {
                log::debug!("status update dropped: {e}");
            }
        }
    }
}

/// Create a bounded status channel and its fire-and-forget sender.
pub fn status_channel(capacity: usize) -> (StatusSender, mpsc::Receiver<StatusUpdate>) {
    let (tx, rx) = mpsc::channel(capacity);
    (StatusSender::new(tx), rx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
