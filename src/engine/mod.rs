//! The two synthetic-input engines and their shared cancellation plumbing.
//!
//! Exactly one of [`RepeatEngine`] (normal mode) or [`HoldController`]
//! (hold mode) is authoritative at a time, selected by the committed
//! configuration.  Both engines are quiesced — repeat loop cancelled, held
//! key released — before any configuration change, on emergency stop, and
//! on process shutdown ([`QuiesceGuard`]).

pub mod hold;
pub mod repeat;

pub use hold::HoldController;
pub use repeat::{RepeatEngine, StartOutcome};

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// Cooperative cancellation token with an interruptible wait.
///
/// Built on a `Mutex<bool>` + `Condvar` pair so that a worker blocked in
/// [`wait`](CancelToken::wait) wakes up promptly (well under the 10 ms
/// observation bound) when [`cancel`](CancelToken::cancel) is called,
/// instead of only at the next interval boundary.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Signal cancellation and wake every waiter.
    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }

    /// Block for up to `timeout`, returning early if cancelled.
    ///
    /// Returns `true` when the token was cancelled, `false` when the full
    /// timeout elapsed.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;

        let mut cancelled = flag.lock().unwrap();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timed_out) = cvar.wait_timeout(cancelled, deadline - now).unwrap();
            cancelled = guard;
        }
        true
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// QuiesceGuard
// ---------------------------------------------------------------------------

/// RAII guard that quiesces both engines when dropped.
///
/// Held in `main` so that any exit path — clean shutdown, panic unwind —
/// cancels the repeat loop and releases a held key before the process
/// terminates.  The safety invariant is that no synthetic key is ever left
/// stuck down.
pub struct QuiesceGuard {
    repeat: Arc<RepeatEngine>,
    hold: Arc<HoldController>,
}

impl QuiesceGuard {
    pub fn new(repeat: Arc<RepeatEngine>, hold: Arc<HoldController>) -> Self {
        Self { repeat, hold }
    }
}

impl Drop for QuiesceGuard {
    fn drop(&mut self) {
        log::debug!("quiesce guard: stopping engines");
        self.repeat.stop();
        self.hold.force_release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{KeyEmitter, MockEmitter};
    use crate::key::resolve;
    use crate::status::StatusSender;

    #[test]
    fn token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn wait_returns_false_on_timeout() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wait_returns_true_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(token.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    /// A waiter blocked on a long timeout must observe cancellation promptly.
    #[test]
    fn cancel_interrupts_a_blocked_waiter() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let handle = std::thread::spawn(move || {
            let start = Instant::now();
            let cancelled = waiter.wait(Duration::from_secs(10));
            (cancelled, start.elapsed())
        });

        std::thread::sleep(Duration::from_millis(30));
        token.cancel();

        let (cancelled, elapsed) = handle.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn quiesce_guard_releases_held_key_on_drop() {
        let emitter = Arc::new(MockEmitter::new());
        let repeat = Arc::new(RepeatEngine::new(
            Arc::clone(&emitter) as Arc<dyn KeyEmitter>,
            StatusSender::disabled(),
        ));
        let hold = Arc::new(HoldController::new(
            Arc::clone(&emitter) as Arc<dyn KeyEmitter>,
            StatusSender::disabled(),
        ));

        hold.toggle(&resolve("a").unwrap());
        assert!(hold.is_held());

        drop(QuiesceGuard::new(repeat, Arc::clone(&hold)));

        assert!(!hold.is_held());
        assert_eq!(emitter.held_count(), 0);
    }
}
