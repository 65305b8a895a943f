//! The settings gate — the only component allowed to mutate the active
//! configuration.
//!
//! [`validate`] turns the raw [`SettingsFile`] surface into a [`Config`]
//! snapshot or a [`ValidationError`]; [`SettingsGate::commit`] additionally
//! quiesces both engines (repeat loop stopped, held key released) before
//! atomically publishing the new snapshot, so a configuration change can
//! never race with in-flight synthetic input.  Validation failures never
//! touch the committed configuration.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{Config, Mode, SettingsFile, SharedConfig};
use crate::engine::{HoldController, RepeatEngine};
use crate::key::{self, ParseError};
use crate::status::{StatusSender, StatusUpdate};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// All the ways a settings commit can be rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A key name failed to resolve.
    #[error("invalid {field} key: {source}")]
    InvalidKey {
        field: &'static str,
        #[source]
        source: ParseError,
    },

    /// Initiate and target resolve to the same key or the same key family.
    #[error("initiate key and target key cannot be the same key (or same family)")]
    SameKey,

    /// A time field contains something other than a non-negative whole
    /// number.
    #[error("time field {field:?} must be a non-negative whole number, got {value:?}")]
    NonNumericTime {
        field: &'static str,
        value: String,
    },

    /// The computed interval is zero while the mode is Normal.
    #[error("interval must be greater than zero in normal mode")]
    NonPositiveInterval,

    /// The combined time fields overflow what an interval can represent.
    #[error("interval is too large")]
    IntervalOverflow,
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

/// Validate a raw settings surface into a [`Config`] snapshot.
///
/// Pure — no engine interaction, no publication.  Used by
/// [`SettingsGate::commit`] and by startup to vet the persisted file.
///
/// Validation order: keys parse, key pair does not conflict, time fields
/// are digit-only (empty means zero), the combined interval does not
/// overflow, interval is positive for Normal mode.
pub fn validate(settings: &SettingsFile) -> Result<Config, ValidationError> {
    let initiate = key::resolve(&settings.initiate_key)
        .map_err(|source| ValidationError::InvalidKey {
            field: "initiate",
            source,
        })?;
    let target = key::resolve(&settings.target_key).map_err(|source| {
        ValidationError::InvalidKey {
            field: "target",
            source,
        }
    })?;

    if key::identities_conflict(&initiate, &target) {
        return Err(ValidationError::SameKey);
    }

    let hours = parse_time_field("hours", &settings.hours)?;
    let minutes = parse_time_field("minutes", &settings.minutes)?;
    let seconds = parse_time_field("seconds", &settings.seconds)?;
    let millis = parse_time_field("milliseconds", &settings.milliseconds)?;

    // Checked throughout: a digit-only field can still be astronomically
    // large, and a wrapped interval would be worse than a rejection.
    let secs = hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or(ValidationError::IntervalOverflow)?;
    let interval = Duration::from_secs(secs)
        .checked_add(Duration::from_millis(millis))
        .ok_or(ValidationError::IntervalOverflow)?;

    if settings.mode == Mode::Normal && interval.is_zero() {
        return Err(ValidationError::NonPositiveInterval);
    }

    Ok(Config {
        initiate,
        target,
        mode: settings.mode,
        interval,
        allow_sub_minimum: settings.allow_sub_minimum,
    })
}

/// Parse one h/m/s/ms field: empty means zero, otherwise ASCII digits only.
fn parse_time_field(field: &'static str, raw: &str) -> Result<u64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NonNumericTime {
            field,
            value: raw.to_string(),
        });
    }
    // Digit-only but overflowing u64 is rejected the same way.
    trimmed
        .parse()
        .map_err(|_| ValidationError::NonNumericTime {
            field,
            value: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// SettingsGate
// ---------------------------------------------------------------------------

/// Validates and atomically swaps the active configuration.
pub struct SettingsGate {
    config: SharedConfig,
    repeat: Arc<RepeatEngine>,
    hold: Arc<HoldController>,
    status: StatusSender,
}

impl SettingsGate {
    pub fn new(
        config: SharedConfig,
        repeat: Arc<RepeatEngine>,
        hold: Arc<HoldController>,
        status: StatusSender,
    ) -> Self {
        Self {
            config,
            repeat,
            hold,
            status,
        }
    }

    /// Validate `settings` and, on success, publish them as the active
    /// configuration.
    ///
    /// Before the new snapshot becomes visible, any in-flight action is
    /// cleanly stopped: the repeat loop is cancelled (bounded wait) and a
    /// held target key is released.  On any [`ValidationError`] the prior
    /// configuration stays active and the engines are left untouched.
    pub fn commit(&self, settings: &SettingsFile) -> Result<Arc<Config>, ValidationError> {
        let config = validate(settings)?;

        self.repeat.stop();
        self.hold.force_release();

        self.config.replace(config);
        let snapshot = self.config.snapshot();

        log::info!(
            "settings committed: initiate={} target={} mode={:?} interval={} ms",
            snapshot.initiate,
            snapshot.target,
            snapshot.mode,
            snapshot.interval.as_millis()
        );
        self.status.send(StatusUpdate::Idle);

        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
