//! Repeating-press loop for normal mode.
//!
//! # Design
//!
//! The loop runs on a dedicated named OS thread, like the global key
//! listener — it sleeps most of its life and must not be tied to the async
//! runtime.  `start` is guarded by a start lock so at most one loop is ever
//! active; a second start while running reports [`StartOutcome::AlreadyRunning`]
//! instead of spawning a competitor.
//!
//! `stop` is cooperative: it cancels the token and waits a bounded 200 ms
//! for the worker to wind down, but the `running` flag — cleared by the
//! loop itself on exit — is the source of truth for idleness.  Each
//! iteration pairs press with release, so the loop needs no extra cleanup
//! on cancellation; an injection failure terminates the loop back to idle
//! rather than spinning on errors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::emit::KeyEmitter;
use crate::key::KeyIdentity;
use crate::status::{StatusSender, StatusUpdate};

use super::CancelToken;

/// Upper bound on how long [`RepeatEngine::stop`] blocks waiting for the
/// worker to acknowledge cancellation.
const STOP_WAIT: Duration = Duration::from_millis(200);

/// Polling step while waiting for the worker to wind down.
const STOP_POLL: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// StartOutcome
// ---------------------------------------------------------------------------

/// Result of a start request.  `AlreadyRunning` is informational, not an
/// error — the existing loop keeps running untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

// ---------------------------------------------------------------------------
// RepeatEngine
// ---------------------------------------------------------------------------

struct Worker {
    cancel: CancelToken,
    handle: thread::JoinHandle<()>,
}

/// Owns the background repeating-press loop.
///
/// State machine: `Idle → Running → Idle`.  Shareable behind an `Arc`; all
/// methods take `&self`.
pub struct RepeatEngine {
    emitter: Arc<dyn KeyEmitter>,
    status: StatusSender,
    /// True exactly while the worker loop is executing.  Set by `start`,
    /// cleared by the loop itself on exit.
    running: Arc<AtomicBool>,
    /// Start lock plus handle to the current (or most recent) worker.
    worker: Mutex<Option<Worker>>,
}

impl RepeatEngine {
    pub fn new(emitter: Arc<dyn KeyEmitter>, status: StatusSender) -> Self {
        Self {
            emitter,
            status,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// True while the repeat loop is active (including wind-down after a
    /// stop request, until the loop has actually exited).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start repeating press/release of `target` every `interval`.
    ///
    /// Returns [`StartOutcome::AlreadyRunning`] without side effects when a
    /// loop is already active — the start lock guarantees at most one loop
    /// even under concurrent start requests.
    pub fn start(&self, interval: Duration, target: KeyIdentity) -> StartOutcome {
        let mut worker = self.worker.lock().unwrap();

        if self.running.load(Ordering::SeqCst) {
            log::debug!("repeat: start requested while already running");
            return StartOutcome::AlreadyRunning;
        }

        // Reap the previous worker, if any; its loop has already exited.
        if let Some(old) = worker.take() {
            let _ = old.handle.join();
        }

        let cancel = CancelToken::new();
        self.running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("repeat-engine".into())
            .spawn({
                let emitter = Arc::clone(&self.emitter);
                let status = self.status.clone();
                let running = Arc::clone(&self.running);
                let cancel = cancel.clone();
                move || run_loop(&*emitter, &status, &running, &cancel, interval, &target)
            })
            .expect("failed to spawn repeat-engine thread");

        *worker = Some(Worker { cancel, handle });

        log::info!("repeat: started ({} ms interval)", interval.as_millis());
        StartOutcome::Started
    }

    /// Signal cancellation and wait up to 200 ms for the loop to wind down.
    ///
    /// Best-effort join: on return the loop has almost always exited, but
    /// callers needing certainty must watch [`is_running`](Self::is_running).
    /// No-op when idle.
    pub fn stop(&self) {
        let cancel = {
            let mut worker = self.worker.lock().unwrap();
            match worker.take() {
                Some(w) if self.running.load(Ordering::SeqCst) => {
                    // Keep nothing to join — the loop detaches and clears
                    // `running` on its own.
                    drop(w.handle);
                    Some(w.cancel)
                }
                Some(w) => {
                    let _ = w.handle.join();
                    None
                }
                None => None,
            }
        };

        let Some(cancel) = cancel else {
            return;
        };

        self.status.send(StatusUpdate::Stopping);
        cancel.cancel();

        let deadline = Instant::now() + STOP_WAIT;
        while self.running.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(STOP_POLL);
        }

        if self.running.load(Ordering::SeqCst) {
            log::warn!(
                "repeat: loop did not wind down within {} ms; it will exit on its own",
                STOP_WAIT.as_millis()
            );
        } else {
            log::info!("repeat: stopped");
        }
    }
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

fn run_loop(
    emitter: &dyn KeyEmitter,
    status: &StatusSender,
    running: &AtomicBool,
    cancel: &CancelToken,
    interval: Duration,
    target: &KeyIdentity,
) {
    status.send(StatusUpdate::Running);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        if let Err(e) = press_release(emitter, target) {
            // One failed injection must not leave the loop spinning.
            log::error!("repeat: injection failed, stopping loop: {e}");
            status.send(StatusUpdate::Error(e.to_string()));
            break;
        }

        // Interruptible wait — a stop request is observed within ~10 ms,
        // not at the next interval boundary.
        if cancel.wait(interval) {
            break;
        }
    }

    running.store(false, Ordering::SeqCst);
    status.send(StatusUpdate::Idle);
}

fn press_release(
    emitter: &dyn KeyEmitter,
    target: &KeyIdentity,
) -> Result<(), crate::emit::EmitterError> {
    emitter.press(target)?;
    emitter.release(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::MockEmitter;
    use crate::key::resolve;

    fn make_engine() -> (Arc<RepeatEngine>, Arc<MockEmitter>) {
        let emitter = Arc::new(MockEmitter::new());
        let engine = Arc::new(RepeatEngine::new(
            Arc::clone(&emitter) as Arc<dyn KeyEmitter>,
            StatusSender::disabled(),
        ));
        (engine, emitter)
    }

    fn target() -> KeyIdentity {
        resolve("a").unwrap()
    }

    /// Poll until `cond` holds or the deadline passes.
    fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn starts_and_emits_paired_press_release() {
        let (engine, emitter) = make_engine();

        assert_eq!(
            engine.start(Duration::from_millis(5), target()),
            StartOutcome::Started
        );
        assert!(wait_for(|| emitter.presses() >= 3, Duration::from_secs(2)));

        engine.stop();
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(1)));
        assert_eq!(emitter.held_count(), 0);
    }

    #[test]
    fn second_start_reports_already_running() {
        let (engine, _emitter) = make_engine();

        assert_eq!(
            engine.start(Duration::from_millis(10), target()),
            StartOutcome::Started
        );
        assert_eq!(
            engine.start(Duration::from_millis(10), target()),
            StartOutcome::AlreadyRunning
        );

        engine.stop();
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(1)));
    }

    /// Stop must interrupt a long interval wait promptly rather than
    /// sleeping out the full interval.
    #[test]
    fn stop_interrupts_long_interval_promptly() {
        let (engine, _emitter) = make_engine();

        engine.start(Duration::from_secs(60), target());
        assert!(wait_for(|| engine.is_running(), Duration::from_secs(1)));

        let start = Instant::now();
        engine.stop();
        assert!(
            start.elapsed() < Duration::from_millis(300),
            "stop took {:?}",
            start.elapsed()
        );
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(1)));
    }

    #[test]
    fn stop_when_idle_is_a_noop() {
        let (engine, emitter) = make_engine();
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(emitter.presses(), 0);
    }

    #[test]
    fn injection_failure_terminates_loop_to_idle() {
        let (engine, emitter) = make_engine();
        emitter.set_failing(true);

        engine.start(Duration::from_millis(5), target());
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(2)));
        assert_eq!(emitter.presses(), 0);
    }

    #[test]
    fn engine_can_restart_after_stop() {
        let (engine, emitter) = make_engine();

        engine.start(Duration::from_millis(5), target());
        engine.stop();
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(1)));

        let before = emitter.presses();
        assert_eq!(
            engine.start(Duration::from_millis(5), target()),
            StartOutcome::Started
        );
        assert!(wait_for(
            || emitter.presses() > before,
            Duration::from_secs(2)
        ));

        engine.stop();
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(1)));
    }

    /// Simulated concurrent initiate presses: exactly one loop may win.
    #[test]
    fn concurrent_starts_yield_exactly_one_loop() {
        let (engine, _emitter) = make_engine();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                engine.start(Duration::from_millis(10), target())
            }));
        }

        let outcomes: Vec<StartOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let started = outcomes
            .iter()
            .filter(|o| **o == StartOutcome::Started)
            .count();
        assert_eq!(started, 1, "outcomes: {outcomes:?}");

        engine.stop();
        assert!(wait_for(|| !engine.is_running(), Duration::from_secs(1)));
    }
}
