//! Event dispatcher — routes raw key events to the engines.
//!
//! # Design
//!
//! The OS hook thread pushes [`RawKeyEvent`]s into a `tokio::sync::mpsc`
//! channel; [`Dispatcher::run`] consumes them on its own task, so hook
//! timing is fully decoupled from dispatch logic.  For each event:
//!
//! 1. map the raw key to a [`KeyIdentity`]; unmappable keys are ignored
//! 2. Esc — the fixed emergency-stop key — unconditionally forces both
//!    engines back to idle/released, regardless of mode or configuration
//! 3. a key identical to (or same-family as) the configured initiate key
//!    toggles the hold controller (hold mode) or the repeat engine
//!    (normal mode)
//! 4. everything else is ignored
//!
//! A sub-minimum interval that has not been confirmed never starts the
//! loop and never blocks: the dispatcher emits
//! [`StatusUpdate::ConfirmSubMinimum`] and stays idle; the UI-owning
//! context answers by re-committing the settings with the allow flag set.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{Config, Mode, SharedConfig, MIN_INTERVAL};
use crate::engine::{HoldController, RepeatEngine, StartOutcome};
use crate::key;
use crate::status::{StatusSender, StatusUpdate};

// ---------------------------------------------------------------------------
// RawKeyEvent
// ---------------------------------------------------------------------------

/// A raw key-press notification from the global listener.
#[derive(Debug, Clone, PartialEq)]
pub struct RawKeyEvent {
    pub key: rdev::Key,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Consumes raw key events and drives the engines per the committed
/// configuration.
pub struct Dispatcher {
    config: SharedConfig,
    repeat: Arc<RepeatEngine>,
    hold: Arc<HoldController>,
    status: StatusSender,
}

impl Dispatcher {
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

    /// Run the dispatcher until `events` is closed.
    ///
    /// Spawn as a tokio task from `main()`; it never returns while the
    /// channel is open.
    pub async fn run(self, mut events: mpsc::Receiver<RawKeyEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        log::info!("dispatch: key event channel closed, dispatcher shutting down");
    }

    fn handle(&self, event: RawKeyEvent) {
        let Some(identity) = key::from_rdev(event.key) else {
            return;
        };

        // Emergency stop always wins, regardless of mode or configuration.
        if identity == key::EMERGENCY_STOP {
            self.emergency_stop();
            return;
        }

        let config = self.config.snapshot();
        if !key::identities_conflict(&identity, &config.initiate) {
            return;
        }

        log::debug!("dispatch: initiate key {identity} matched");
        match config.mode {
            Mode::Hold => self.hold.toggle(&config.target),
            Mode::Normal => self.toggle_repeat(&config),
        }
    }

    fn toggle_repeat(&self, config: &Config) {
        if self.repeat.is_running() {
            // stop() blocks this task for at most 200 ms; later events
            // queue behind it on the channel.
            self.repeat.stop();
            return;
        }

        if config.interval < MIN_INTERVAL && !config.allow_sub_minimum {
            log::warn!(
                "dispatch: interval {} ms is below the {} ms floor; confirmation required",
                config.interval.as_millis(),
                MIN_INTERVAL.as_millis()
            );
            self.status.send(StatusUpdate::ConfirmSubMinimum {
                interval: config.interval,
            });
            return;
        }

        match self.repeat.start(config.interval, config.target.clone()) {
            StartOutcome::Started => {}
            StartOutcome::AlreadyRunning => self.status.send(StatusUpdate::AlreadyRunning),
        }
    }

    fn emergency_stop(&self) {
        log::warn!("dispatch: emergency stop");
        self.repeat.stop();
        self.hold.force_release();
        self.status.send(StatusUpdate::EmergencyStop);
    }

    #[cfg(test)]
    fn handle_key(&self, raw: rdev::Key) {
        self.handle(RawKeyEvent { key: raw });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::config::SettingsFile;
    use crate::emit::{KeyEmitter, MockEmitter};
    use crate::key::resolve;
    use crate::settings;
    use crate::status::status_channel;

    struct Harness {
        dispatcher: Dispatcher,
        repeat: Arc<RepeatEngine>,
        hold: Arc<HoldController>,
        emitter: Arc<MockEmitter>,
        status_rx: mpsc::Receiver<StatusUpdate>,
    }

    fn harness(settings_file: SettingsFile) -> Harness {
        let emitter = Arc::new(MockEmitter::new());
        let (status_tx, status_rx) = status_channel(64);

        let repeat = Arc::new(RepeatEngine::new(
            Arc::clone(&emitter) as Arc<dyn KeyEmitter>,
            status_tx.clone(),
        ));
        let hold = Arc::new(HoldController::new(
            Arc::clone(&emitter) as Arc<dyn KeyEmitter>,
            status_tx.clone(),
        ));

        let config = SharedConfig::new(settings::validate(&settings_file).unwrap());

        let dispatcher = Dispatcher::new(
            config,
            Arc::clone(&repeat),
            Arc::clone(&hold),
            status_tx,
        );

        Harness {
            dispatcher,
            repeat,
            hold,
            emitter,
            status_rx,
        }
    }

    fn normal_settings() -> SettingsFile {
        // f7 initiate, 'a' target, 20 ms interval, confirmed sub-minimum.
        SettingsFile {
            milliseconds: "20".into(),
            allow_sub_minimum: true,
            ..SettingsFile::default()
        }
    }

    fn hold_settings() -> SettingsFile {
        SettingsFile {
            mode: Mode::Hold,
            ..SettingsFile::default()
        }
    }

    fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn drain(rx: &mut mpsc::Receiver<StatusUpdate>) -> Vec<StatusUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    // --- routing ---

    #[test]
    fn unrelated_keys_are_ignored() {
        let h = harness(normal_settings());
        h.dispatcher.handle_key(rdev::Key::KeyB);
        h.dispatcher.handle_key(rdev::Key::F9);

        assert!(!h.repeat.is_running());
        assert!(!h.hold.is_held());
        assert_eq!(h.emitter.presses(), 0);
    }

    #[test]
    fn unmappable_keys_are_ignored() {
        let h = harness(normal_settings());
        h.dispatcher.handle_key(rdev::Key::Unknown(0xDEAD));
        assert!(!h.repeat.is_running());
    }

    #[test]
    fn initiate_press_starts_repeat_in_normal_mode() {
        let h = harness(normal_settings());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.repeat.is_running());
        assert!(wait_for(|| h.emitter.presses() >= 1, Duration::from_secs(2)));

        h.repeat.stop();
        assert!(wait_for(|| !h.repeat.is_running(), Duration::from_secs(1)));
    }

    #[test]
    fn second_initiate_press_stops_repeat() {
        let h = harness(normal_settings());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.repeat.is_running());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(wait_for(|| !h.repeat.is_running(), Duration::from_secs(1)));
        assert_eq!(h.emitter.held_count(), 0);
    }

    /// Binding the base modifier name matches either physical side.
    #[test]
    fn same_family_initiate_press_matches() {
        let mut s = hold_settings();
        s.initiate_key = "ctrl".into();
        let h = harness(s);

        h.dispatcher.handle_key(rdev::Key::ControlRight);
        assert!(h.hold.is_held());

        h.hold.force_release();
    }

    // --- hold mode ---

    #[test]
    fn hold_mode_toggles_on_each_initiate_press() {
        let h = harness(hold_settings());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.hold.is_held());
        assert_eq!(h.emitter.presses(), 1);

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(!h.hold.is_held());
        assert_eq!(h.emitter.releases(), 1);
        assert_eq!(h.emitter.held_count(), 0);
    }

    // --- emergency stop ---

    #[test]
    fn escape_stops_running_repeat() {
        let h = harness(normal_settings());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.repeat.is_running());

        h.dispatcher.handle_key(rdev::Key::Escape);
        assert!(wait_for(|| !h.repeat.is_running(), Duration::from_secs(1)));
        assert_eq!(h.emitter.held_count(), 0);
    }

    #[test]
    fn escape_releases_held_key() {
        let h = harness(hold_settings());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.hold.is_held());

        h.dispatcher.handle_key(rdev::Key::Escape);
        assert!(!h.hold.is_held());
        assert_eq!(h.emitter.held_count(), 0);
    }

    #[test]
    fn escape_when_idle_is_harmless() {
        let mut h = harness(normal_settings());
        h.dispatcher.handle_key(rdev::Key::Escape);

        assert!(!h.repeat.is_running());
        let updates = drain(&mut h.status_rx);
        assert!(updates.contains(&StatusUpdate::EmergencyStop));
    }

    /// Emergency stops racing a stream of start attempts still end idle.
    #[test]
    fn escape_wins_against_concurrent_start() {
        let h = harness(normal_settings());
        let dispatcher = Arc::new(h.dispatcher);

        // Starts keep arriving on another thread while stops are delivered.
        let starter = {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                for _ in 0..20 {
                    dispatcher.handle_key(rdev::Key::F7);
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
        };

        for _ in 0..10 {
            dispatcher.handle_key(rdev::Key::Escape);
            std::thread::sleep(Duration::from_millis(2));
        }
        starter.join().unwrap();

        // Whatever the interleaving, the last word is the emergency stop.
        dispatcher.handle_key(rdev::Key::Escape);
        assert!(wait_for(|| !h.repeat.is_running(), Duration::from_secs(1)));
        assert!(!h.hold.is_held());
        assert_eq!(h.emitter.held_count(), 0);
    }

    /// A stop toggle must return within the engine's wind-down bound so
    /// the dispatcher keeps draining its channel.
    #[test]
    fn stop_toggle_returns_within_the_wind_down_bound() {
        let h = harness(normal_settings());

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.repeat.is_running());

        let start = Instant::now();
        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(
            start.elapsed() < Duration::from_millis(300),
            "stop toggle took {:?}",
            start.elapsed()
        );
        assert!(wait_for(|| !h.repeat.is_running(), Duration::from_secs(1)));
    }

    // --- sub-minimum confirmation ---

    #[test]
    fn unconfirmed_sub_minimum_interval_does_not_start() {
        let mut s = normal_settings();
        s.milliseconds = "10".into();
        s.allow_sub_minimum = false;
        let mut h = harness(s);

        h.dispatcher.handle_key(rdev::Key::F7);

        assert!(!h.repeat.is_running());
        let updates = drain(&mut h.status_rx);
        assert!(updates.iter().any(|u| matches!(
            u,
            StatusUpdate::ConfirmSubMinimum {
                interval
            } if *interval == Duration::from_millis(10)
        )));
    }

    #[test]
    fn confirmed_sub_minimum_interval_starts_immediately() {
        let mut s = normal_settings();
        s.milliseconds = "10".into();
        s.allow_sub_minimum = true;
        let h = harness(s);

        h.dispatcher.handle_key(rdev::Key::F7);
        assert!(h.repeat.is_running());

        h.repeat.stop();
        assert!(wait_for(|| !h.repeat.is_running(), Duration::from_secs(1)));
    }

    // --- async channel loop ---

    #[tokio::test]
    async fn run_processes_events_until_channel_closes() {
        let h = harness(hold_settings());
        let (tx, rx) = mpsc::channel(8);

        tx.send(RawKeyEvent { key: rdev::Key::F7 }).await.unwrap();
        tx.send(RawKeyEvent { key: rdev::Key::F7 }).await.unwrap();
        drop(tx);

        h.dispatcher.run(rx).await;

        assert!(!h.hold.is_held());
        assert_eq!(h.emitter.presses(), 1);
        assert_eq!(h.emitter.releases(), 1);
    }

    #[tokio::test]
    async fn run_applies_emergency_stop_from_channel() {
        let h = harness(hold_settings());
        let (tx, rx) = mpsc::channel(8);

        tx.send(RawKeyEvent { key: rdev::Key::F7 }).await.unwrap();
        tx.send(RawKeyEvent {
            key: rdev::Key::Escape,
        })
        .await
        .unwrap();
        drop(tx);

        h.dispatcher.run(rx).await;

        assert!(!h.hold.is_held());
        assert_eq!(h.emitter.held_count(), 0);
    }
}
