//! PoseStream client application entry point.
//!
//! Wires together the capture pump, the discovery/handshake use case, the
//! streaming loop, and the UI bridge, then runs the Tokio event loop.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML config with defaults
//!  └─ start_capture_pump()     -- sensor adapter thread (mock here)
//!  └─ spawn_blocking(connect_session)
//!       └─ subnet scan → TCP connect → clock sync
//!  └─ start_streaming()        -- 24 Hz worker thread
//!  └─ event dispatch loop
//!       ├─ StatusChanged / TrackedSubjects -> app state mirror
//!       ├─ GestureConfirmed               -> one-shot acknowledgment
//!       └─ Disconnected                   -> exit
//! ```
//!
//! The mock capture source used here synthesizes a standing figure rather
//! than reading a physical sensor.  A production build replaces it with the
//! sensor SDK adapter behind the same `CaptureSource` trait.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pose_client::application::stream::{connect_session, start_streaming};
use pose_client::infrastructure::{
    capture::{start_capture_pump, MockCaptureSource, SharedSubjects},
    storage::config::load_config,
    ui_bridge::{ClientAppState, ConnectionStatus, StreamEvent},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.client.log_level.clone())),
        )
        .init();

    info!("PoseStream client starting");

    let app_state = ClientAppState::new();
    let running = Arc::new(AtomicBool::new(true));

    // ── Capture pump ──────────────────────────────────────────────────────────
    // Mock source: one standing figure.  Swap for the sensor adapter in a
    // production build.
    let subjects = SharedSubjects::new();
    let capture_source = Arc::new(MockCaptureSource::standing_figure(1));
    let capture_thread = start_capture_pump(
        capture_source,
        subjects.clone(),
        Arc::clone(&running),
        config.stream.tick_interval(),
    );

    // ── Session setup (blocking: scan + connect + clock sync) ─────────────────
    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(64);

    {
        let mut status = app_state.connection_status.lock().await;
        *status = ConnectionStatus::Searching;
    }

    let session = {
        let network = config.network.clone();
        let state = Arc::clone(&app_state);
        let tx = events_tx.clone();
        tokio::task::spawn_blocking(move || connect_session(&network, &state, &tx)).await?
    };

    let session = match session {
        Ok(session) => session,
        Err(e) => {
            error!("could not establish a session: {e}");
            running.store(false, Ordering::Relaxed);
            let _ = capture_thread.join();
            return Ok(());
        }
    };

    {
        let mut status = app_state.connection_status.lock().await;
        *status = ConnectionStatus::Streaming;
    }

    let mut stream_handle = start_streaming(
        session,
        subjects,
        events_tx,
        config.stream.tick_interval(),
    );

    // ── Event dispatch loop ───────────────────────────────────────────────────
    info!("PoseStream client streaming.  Press Ctrl-C to exit.");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    StreamEvent::StatusChanged(line) => {
                        info!("{line}");
                        let mut status_line = app_state.status_line.lock().await;
                        *status_line = line;
                    }
                    StreamEvent::Connected { peer } => {
                        info!("session established with {peer}");
                    }
                    StreamEvent::GestureConfirmed { tracking_id } => {
                        // One-shot acknowledgment; a UI build triggers its
                        // notification animation here.
                        info!("calibration gesture confirmed for subject {tracking_id}");
                    }
                    StreamEvent::TrackedSubjects(count) => {
                        let mut tracked = app_state.tracked_subjects.lock().await;
                        *tracked = count;
                    }
                    StreamEvent::Disconnected => {
                        let mut status = app_state.connection_status.lock().await;
                        *status = ConnectionStatus::Idle;
                        break;
                    }
                }
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    running.store(false, Ordering::Relaxed);
    stream_handle.disconnect();
    if capture_thread.join().is_err() {
        error!("capture thread panicked");
    }

    info!("PoseStream client stopped");
    Ok(())
}
