//! Dedicated OS-thread global key listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`KeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! Every key *press* is forwarded as a [`RawKeyEvent`] — the dispatcher
//! does all matching, so the listener needs no knowledge of the current
//! configuration and never has to be restarted on a settings change.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will
//! remain blocked in the rdev event loop until the process exits.  This is
//! safe and expected — rdev holds no resources that need explicit cleanup.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use crate::dispatch::RawKeyEvent;

// ---------------------------------------------------------------------------
// KeyListener
// ---------------------------------------------------------------------------

/// Handle to a running global key listener thread.
///
/// Construct one with [`KeyListener::start`].  Drop it to stop forwarding
/// events.
pub struct KeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// The thread handle.  Kept alive so the thread is not detached
    /// prematurely; we never `join` it because `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl KeyListener {
    /// Spawn a dedicated OS thread that listens for global key events and
    /// forwards every key press on `tx`.
    ///
    /// The background thread uses `blocking_send` so it works correctly
    /// from a non-async context.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(tx: mpsc::Sender<RawKeyEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("key-listener".into())
            .spawn(move || {
                let result = rdev::listen(move |event| {
                    // Bail out if the listener has been stopped.
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    if let rdev::EventType::KeyPress(key) = event.event_type {
                        // blocking_send is safe to call from non-async threads.
                        let _ = tx.blocking_send(RawKeyEvent { key });
                    }
                });

                if let Err(e) = result {
                    log::error!("key-listener: rdev::listen exited with error: {:?}", e);
                }
            })
            .expect("failed to spawn key-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for KeyListener {
    /// Set the stop flag so the rdev callback stops forwarding events.
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        // The OS thread continues to exist blocked inside rdev::listen until
        // the process exits — this is safe and requires no further cleanup.
    }
}
