//! Toggle-hold controller for hold mode.
//!
//! State machine: `Idle → Held → Idle`, driven by each matching
//! initiate-key *press* (toggle semantics — the second press releases; the
//! physical release of the initiate key is irrelevant).
//!
//! The controller remembers which [`KeyIdentity`] it pressed, so
//! [`force_release`](HoldController::force_release) releases the right key
//! even if the configured target has changed since the hold began.

use std::sync::{Arc, Mutex};

use crate::emit::KeyEmitter;
use crate::key::KeyIdentity;
use crate::status::{StatusSender, StatusUpdate};

// ---------------------------------------------------------------------------
// HoldController
// ---------------------------------------------------------------------------

/// Owns the hold-mode state.  Shareable behind an `Arc`; all methods take
/// `&self`.
pub struct HoldController {
    emitter: Arc<dyn KeyEmitter>,
    status: StatusSender,
    /// The key currently held down by this controller, if any.
    held: Mutex<Option<KeyIdentity>>,
}

impl HoldController {
    pub fn new(emitter: Arc<dyn KeyEmitter>, status: StatusSender) -> Self {
        Self {
            emitter,
            status,
            held: Mutex::new(None),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.lock().unwrap().is_some()
    }

    /// Toggle between held and released.
    ///
    /// - Idle → Held: press `target` and remember it.  A failed press
    ///   leaves the controller idle (nothing to clean up).
    /// - Held → Idle: release the remembered key.  A failed release is
    ///   logged but the state still transitions to idle — the controller
    ///   never claims to hold a key it already tried to let go of.
    pub fn toggle(&self, target: &KeyIdentity) {
        let mut held = self.held.lock().unwrap();

        match held.take() {
            Some(key) => {
                if let Err(e) = self.emitter.release(&key) {
                    log::warn!("hold: release of {key} failed: {e}");
                    self.status.send(StatusUpdate::Error(e.to_string()));
                } else {
                    log::info!("hold: released {key}");
                }
                self.status.send(StatusUpdate::Idle);
            }
            None => match self.emitter.press(target) {
                Ok(()) => {
                    *held = Some(target.clone());
                    log::info!("hold: holding {target}");
                    self.status.send(StatusUpdate::Holding);
                }
                Err(e) => {
                    log::error!("hold: press of {target} failed: {e}");
                    self.status.send(StatusUpdate::Error(e.to_string()));
                }
            },
        }
    }

    /// Release the held key unconditionally, if any.
    ///
    /// Used by emergency stop, settings commit and shutdown.  Always
    /// transitions to idle; a failed release is logged but never surfaced,
    /// since every caller is already on a cleanup path.
    pub fn force_release(&self) {
        let mut held = self.held.lock().unwrap();
        if let Some(key) = held.take() {
            if let Err(e) = self.emitter.release(&key) {
                log::warn!("hold: forced release of {key} failed: {e}");
            } else {
                log::info!("hold: forced release of {key}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
