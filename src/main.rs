//! Application entry point — autopress.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`SettingsFile`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the emitter and both engines around it.
//! 5. Commit the loaded settings through the [`SettingsGate`] (falls back
//!    to defaults if the file is invalid).
//! 6. Spawn the status logging task — the headless stand-in for a UI
//!    status label.
//! 7. Spawn the global key listener thread and the dispatcher task.
//! 8. Block on Ctrl-C, then quiesce both engines before exiting.
//!
//! A [`QuiesceGuard`] additionally stops the repeat loop and releases any
//! held key on *any* exit path, including a panic unwind — no synthetic
//! key may outlive the process.

use std::sync::Arc;

use tokio::sync::mpsc;

use autopress::{
    config::{SettingsFile, SharedConfig},
    dispatch::{Dispatcher, RawKeyEvent},
    emit::{EnigoEmitter, KeyEmitter},
    engine::{HoldController, QuiesceGuard, RepeatEngine},
    listener::KeyListener,
    settings::SettingsGate,
    status::status_channel,
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("autopress starting up");

    // 2. Persisted settings
    let settings = SettingsFile::load().unwrap_or_else(|e| {
        log::warn!("Failed to load settings ({e}); using defaults");
        SettingsFile::default()
    });

    // 3. Tokio runtime (dispatcher + status logging)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 4. Emitter and engines
    let (status_tx, mut status_rx) = status_channel(32);
    let emitter: Arc<dyn KeyEmitter> = Arc::new(EnigoEmitter::new());

    let repeat = Arc::new(RepeatEngine::new(Arc::clone(&emitter), status_tx.clone()));
    let hold = Arc::new(HoldController::new(Arc::clone(&emitter), status_tx.clone()));
    let config = SharedConfig::default();

    // 5. Commit the persisted settings through the gate
    let gate = SettingsGate::new(
        config.clone(),
        Arc::clone(&repeat),
        Arc::clone(&hold),
        status_tx.clone(),
    );
    match gate.commit(&settings) {
        Ok(active) => log::info!(
            "active configuration: initiate={} target={} mode={:?} interval={} ms",
            active.initiate,
            active.target,
            active.mode,
            active.interval.as_millis()
        ),
        Err(e) => log::warn!("settings file rejected ({e}); keeping defaults"),
    }

    // 6. Status logging task
    rt.spawn(async move {
        while let Some(update) = status_rx.recv().await {
            log::info!("status: {update}");
        }
    });

    // 7. Listener thread + dispatcher task
    let (event_tx, event_rx) = mpsc::channel::<RawKeyEvent>(64);
    let _listener = KeyListener::start(event_tx);

    let dispatcher = Dispatcher::new(
        config,
        Arc::clone(&repeat),
        Arc::clone(&hold),
        status_tx,
    );
    rt.spawn(dispatcher.run(event_rx));

    log::info!("ready — emergency stop: press Esc anytime");

    // 8. Shutdown: quiesce on Ctrl-C, and via the guard on any other exit.
    let _guard = QuiesceGuard::new(Arc::clone(&repeat), Arc::clone(&hold));

    rt.block_on(tokio::signal::ctrl_c())?;

    log::info!("shutdown requested; releasing synthetic input");
    repeat.stop();
    hold.force_release();

    Ok(())
}
