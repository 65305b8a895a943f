//! Synthetic key injection.
//!
//! # Overview
//!
//! [`KeyEmitter`] is the single capability the rest of the core depends on:
//! press and release a resolved [`KeyIdentity`].  It is object-safe and
//! `Send + Sync` so it can be held behind an `Arc<dyn KeyEmitter>` and
//! called from the repeat worker thread, the dispatcher task and the
//! shutdown path alike.
//!
//! [`EnigoEmitter`] is the production implementation backed by the `enigo`
//! crate.  [`MockEmitter`] (available under `#[cfg(test)]`) records every
//! press/release so the engines can be unit-tested without touching the OS
//! input stream.
//!
//! Injection failures are non-fatal by contract: callers log and clean up
//! their own state, and never assume a successful press implies the paired
//! release will succeed.

pub mod backend;

pub use backend::EnigoEmitter;

use thiserror::Error;

use crate::key::KeyIdentity;

// ---------------------------------------------------------------------------
// EmitterError
// ---------------------------------------------------------------------------

/// All errors that can surface while injecting a key event.
#[derive(Debug, Clone, Error)]
pub enum EmitterError {
    /// The OS input backend could not be initialised.
    #[error("cannot initialise input backend: {0}")]
    Backend(String),

    /// The key event could not be delivered to the OS input stream.
    #[error("cannot deliver key event: {0}")]
    Injection(String),

    /// The identity has no injectable mapping on this backend.
    #[error("key has no injectable mapping: {0}")]
    UnsupportedKey(String),
}

// ---------------------------------------------------------------------------
// KeyEmitter trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for pressing and releasing keys.
///
/// # Contract
///
/// - Each call is independent; a failed `press` does not imply the key is
///   down, and a failed `release` may leave it down — callers must attempt
///   their own cleanup.
/// - No side effects beyond the OS input stream.
pub trait KeyEmitter: Send + Sync {
    /// Press `key` down.
    fn press(&self, key: &KeyIdentity) -> Result<(), EmitterError>;

    /// Release `key`.
    fn release(&self, key: &KeyIdentity) -> Result<(), EmitterError>;
}

// Compile-time assertion: Box<dyn KeyEmitter> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn KeyEmitter>) {}
};

// ---------------------------------------------------------------------------
// MockEmitter  (test-only)
// ---------------------------------------------------------------------------

/// Direction of a recorded mock event.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// Test double that records every press/release instead of injecting input.
///
/// `set_failing(true)` makes every subsequent call return
/// [`EmitterError::Injection`] without recording, so failure paths can be
/// exercised deterministically.
#[cfg(test)]
pub struct MockEmitter {
    events: std::sync::Mutex<Vec<(KeyAction, KeyIdentity)>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockEmitter {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail (or succeed again with `false`).
    pub fn set_failing(&self, failing: bool) {
        self.fail
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Snapshot of every recorded event, in order.
    pub fn events(&self) -> Vec<(KeyAction, KeyIdentity)> {
        self.events.lock().unwrap().clone()
    }

    pub fn presses(&self) -> usize {
        self.count(KeyAction::Press)
    }

    pub fn releases(&self) -> usize {
        self.count(KeyAction::Release)
    }

    /// Presses minus releases — must be zero whenever the core is idle.
    pub fn held_count(&self) -> isize {
        self.presses() as isize - self.releases() as isize
    }

    fn count(&self, action: KeyAction) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == action)
            .count()
    }

    fn record(&self, action: KeyAction, key: &KeyIdentity) -> Result<(), EmitterError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(EmitterError::Injection("mock emitter failure".into()));
        }
        self.events.lock().unwrap().push((action, key.clone()));
        Ok(())
    }
}

#[cfg(test)]
impl KeyEmitter for MockEmitter {
    fn press(&self, key: &KeyIdentity) -> Result<(), EmitterError> {
        self.record(KeyAction::Press, key)
    }

    fn release(&self, key: &KeyIdentity) -> Result<(), EmitterError> {
        self.record(KeyAction::Release, key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
