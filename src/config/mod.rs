//! Configuration module.
//!
//! Provides the validated runtime [`Config`] snapshot, the atomically
//! swappable [`SharedConfig`] handle, [`SettingsFile`] (raw-text TOML
//! persistence of the configuration surface) and [`AppPaths`] for
//! cross-platform directories.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::SettingsFile;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::key::KeyIdentity;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Safety floor for the repeat interval.  Intervals below this require
/// explicit operator confirmation (`allow_sub_minimum`) before the repeat
/// loop may start.
pub const MIN_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Selects which engine the initiate key drives.
///
/// | Variant | Behaviour                                                |
/// |---------|----------------------------------------------------------|
/// | Normal  | toggle a repeating press/release loop at a fixed interval |
/// | Hold    | toggle the target key between held-down and released      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Normal,
    Hold,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Normal
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// A fully validated configuration snapshot.
///
/// Produced only by the settings gate (`settings::validate`); the invariant
/// that `initiate` and `target` never conflict is enforced there and never
/// re-checked elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The key whose press event drives mode-specific behaviour.
    pub initiate: KeyIdentity,
    /// The key synthetically pressed/released by the core.
    pub target: KeyIdentity,
    /// Normal (repeat loop) or Hold (toggle-hold).
    pub mode: Mode,
    /// Interval between repeat iterations (normal mode).
    pub interval: Duration,
    /// Operator has confirmed intervals below [`MIN_INTERVAL`].
    pub allow_sub_minimum: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initiate: KeyIdentity::Named("f7"),
            target: KeyIdentity::Character('a'),
            mode: Mode::Normal,
            interval: Duration::from_millis(100),
            allow_sub_minimum: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SharedConfig
// ---------------------------------------------------------------------------

/// Thread-safe handle to the active [`Config`].
///
/// Readers take a cheap [`snapshot`](SharedConfig::snapshot) — an `Arc`
/// clone of the whole struct, so they always observe a fully committed
/// configuration and never a partial mix of fields.  Only the settings
/// gate swaps in a new snapshot.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// The currently committed configuration.
    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.inner.read().unwrap())
    }

    /// Atomically publish a new configuration.  Crate-private: all commits
    /// go through the settings gate.
    pub(crate) fn replace(&self, config: Config) {
        *self.inner.write().unwrap() = Arc::new(config);
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_consistent() {
        let cfg = Config::default();
        assert_eq!(cfg.mode, Mode::Normal);
        assert_eq!(cfg.interval, Duration::from_millis(100));
        assert!(!cfg.allow_sub_minimum);
        assert!(!crate::key::identities_conflict(&cfg.initiate, &cfg.target));
    }

    #[test]
    fn snapshot_is_stable_across_replace() {
        let shared = SharedConfig::default();
        let before = shared.snapshot();

        let mut next = Config::default();
        next.mode = Mode::Hold;
        shared.replace(next);

        // The old snapshot is unchanged; a fresh one sees the new value.
        assert_eq!(before.mode, Mode::Normal);
        assert_eq!(shared.snapshot().mode, Mode::Hold);
    }

    #[test]
    fn shared_config_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedConfig>();
    }
}
