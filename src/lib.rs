//! autopress — a keyboard auto-presser built around a small, thread-safe
//! key-event state machine.
//!
//! A configurable *initiate* key either toggles a repeating synthetic
//! press/release loop of a *target* key at a fixed interval (normal mode)
//! or toggles the target key between held-down and released (hold mode).
//! Esc is a fixed emergency stop.  The hard safety invariant, honoured on
//! every path including settings changes and shutdown, is that a synthetic
//! key is never left stuck down.
//!
//! # Architecture
//!
//! ```text
//! OS keyboard hook (rdev, dedicated thread)
//!   └─▶ listener::KeyListener ──mpsc──▶ dispatch::Dispatcher (tokio task)
//!         ├─ Esc            → emergency stop (both engines quiesced)
//!         ├─ initiate match → engine::RepeatEngine   (normal mode)
//!         │                   engine::HoldController (hold mode)
//!         └─ anything else  → ignored
//!
//! engines ──▶ emit::KeyEmitter (enigo) ──▶ OS input stream
//! settings::SettingsGate ──▶ config::SharedConfig (atomic snapshots)
//! everything ──▶ status::StatusSender (fire-and-forget, toward the UI)
//! ```

pub mod config;
pub mod dispatch;
pub mod emit;
pub mod engine;
pub mod key;
pub mod listener;
pub mod settings;
pub mod status;
