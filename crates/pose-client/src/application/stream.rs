//! The connect-and-stream use case.
//!
//! [`connect_session`] performs the blocking session setup (subnet scan,
//! connect, clock sync) and is meant to run on a caller-supplied blocking
//! context (`tokio::task::spawn_blocking` in the binary) so the presentation
//! layer never freezes.  [`start_streaming`] then takes the session onto a
//! dedicated worker thread that ticks at the configured rate until a
//! disconnect is requested or the transport fails.
//!
//! Session lifecycle:
//!
//! ```text
//! Idle ──scan + connect + clock sync──▶ Streaming
//!   ▲                                      │
//!   └──────disconnect request / send error─┘
//! ```
//!
//! Each tick: copy the current subjects out of the shared buffer, advance
//! the state machine, encode one `Data` document, send it, sleep.  There is
//! no timeout on steady-state sends; a stalled peer stalls the loop until
//! the transport errors out.

use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use pose_core::{encode_message, host_addresses, PoseMessage, SubjectRecord, SubjectTracker};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::infrastructure::network::{
    now_micros, scan_and_connect, sync_clock, ScanError, Session, SessionError,
};
use crate::infrastructure::capture::SharedSubjects;
use crate::infrastructure::storage::config::NetworkConfig;
use crate::infrastructure::ui_bridge::{ClientAppState, StreamEvent};

/// Errors that prevent a session from being established.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The configured local address or subnet mask does not parse.
    #[error("invalid local address or subnet mask: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    /// The discovery scan failed (including normal exhaustion).
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The handshake failed fatally, or the local endpoint could not be read.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Clears the scan-in-progress flag when setup finishes, on every exit path.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Establishes a session: scans the subnet, connects to the first live
/// candidate, and runs the clock-sync handshake.
///
/// Blocking; invoke from a blocking-capable context.  Status changes are
/// reported on `events` as they happen.  Only one scan may run at a time; a
/// concurrent call fails with [`ScanError::ScanInProgress`].
///
/// # Errors
///
/// Returns [`ConnectError`] on bad configuration, scan exhaustion, or a
/// fatal handshake failure.  Exhaustion is a normal outcome; the caller may
/// retry the whole scan later.
pub fn connect_session(
    config: &NetworkConfig,
    state: &ClientAppState,
    events: &mpsc::Sender<StreamEvent>,
) -> Result<Session, ConnectError> {
    if state
        .scan_in_progress
        .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        return Err(ScanError::ScanInProgress.into());
    }
    let _guard = ScanGuard(&state.scan_in_progress);

    emit(events, StreamEvent::StatusChanged("Searching...".to_string()));

    let local: IpAddr = config.local_address.parse()?;
    let mask: IpAddr = config.subnet_mask.parse()?;
    let candidates = host_addresses(local, mask).map_err(ScanError::from)?;
    info!("scanning {} candidate host(s) on port {}", candidates.len(), config.port);

    let (mut stream, peer) =
        match scan_and_connect(&candidates, config.port, config.connect_timeout()) {
            Ok(connected) => connected,
            Err(e) => {
                emit(
                    events,
                    StreamEvent::StatusChanged("Search unsuccessful.".to_string()),
                );
                return Err(e.into());
            }
        };

    let local_address = stream
        .local_addr()
        .map_err(SessionError::from)?
        .to_string();
    emit(
        events,
        StreamEvent::StatusChanged(format!("Client connected to: {peer}.")),
    );
    emit(events, StreamEvent::Connected { peer });

    let clock_offset_us = sync_clock(&mut stream, &local_address, config.sync_timeout())?;

    Ok(Session {
        stream,
        peer,
        local_address,
        clock_offset_us,
    })
}

/// Handle to a running streaming loop.
///
/// Dropping the handle requests a disconnect and joins the worker thread.
pub struct StreamHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Whether the worker thread is still ticking.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Requests a cooperative shutdown and waits for the loop to finish.
    ///
    /// The flag is observed at the top of the next tick, so the call returns
    /// within roughly one tick period.  Safe to call repeatedly, and safe to
    /// call when the loop already ended on its own.
    pub fn disconnect(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("streaming thread panicked");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Starts the steady-rate streaming loop on a dedicated worker thread.
///
/// The loop owns the session.  It exits when `disconnect` is requested or a
/// send fails; either way the socket is shut down at the transport level,
/// and `Disconnected` is reported on `events`.
pub fn start_streaming(
    session: Session,
    subjects: SharedSubjects,
    events: mpsc::Sender<StreamEvent>,
    tick_interval: Duration,
) -> StreamHandle {
    let running = Arc::new(AtomicBool::new(true));
    let running_flag = Arc::clone(&running);

    let thread = std::thread::Builder::new()
        .name("pose-stream".to_string())
        .spawn(move || {
            stream_loop(session, subjects, events, tick_interval, running_flag);
        })
        .expect("failed to spawn streaming thread");

    StreamHandle {
        running,
        thread: Some(thread),
    }
}

/// The worker thread body.
fn stream_loop(
    mut session: Session,
    subjects: SharedSubjects,
    events: mpsc::Sender<StreamEvent>,
    tick_interval: Duration,
    running: Arc<AtomicBool>,
) {
    info!(
        "streaming to {} every {:?} (clock offset {} us)",
        session.peer, tick_interval, session.clock_offset_us
    );

    let mut tracker = SubjectTracker::new();
    let mut last_tracked_count: Option<usize> = None;

    while running.load(Ordering::Relaxed) {
        let snapshots = subjects.snapshot();
        let update = tracker.advance(&snapshots);

        for tracking_id in &update.gestures {
            if !emit(
                &events,
                StreamEvent::GestureConfirmed {
                    tracking_id: *tracking_id,
                },
            ) {
                running.store(false, Ordering::Relaxed);
                break;
            }
        }

        let tracked_count = snapshots.iter().filter(|s| s.is_tracked).count();
        if last_tracked_count != Some(tracked_count) {
            last_tracked_count = Some(tracked_count);
            emit(&events, StreamEvent::TrackedSubjects(tracked_count));
        }

        let records: Vec<SubjectRecord> = snapshots
            .iter()
            .zip(&update.states)
            .map(|(snapshot, state)| SubjectRecord::from_snapshot(snapshot, *state))
            .collect();
        let message = PoseMessage::data(
            session.local_address.clone(),
            now_micros() + session.clock_offset_us,
            records,
        );

        let bytes = match encode_message(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("failed to encode tick message: {e}");
                break;
            }
        };

        if let Err(e) = session.stream.write_all(&bytes) {
            warn!("send failed, ending session: {e}");
            break;
        }

        std::thread::sleep(tick_interval);
    }

    session.shutdown();
    emit(&events, StreamEvent::StatusChanged("Disconnected.".to_string()));
    emit(&events, StreamEvent::Disconnected);
    info!("streaming loop stopped");
}

/// Sends an event, returning `false` when the receiver is gone (the
/// application is shutting down).
fn emit(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    events.blocking_send(event).is_ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::capture::{CaptureSource, MockCaptureSource};
    use std::net::{TcpListener, TcpStream};

    fn test_session(listener: &TcpListener) -> Session {
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).expect("connect");
        let local_address = stream.local_addr().unwrap().to_string();
        Session {
            stream,
            peer: addr,
            local_address,
            clock_offset_us: 0,
        }
    }

    #[test]
    fn test_disconnect_stops_the_loop_within_a_tick() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let session = test_session(&listener);
        let (accepted, _) = listener.accept().unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let mut handle = start_streaming(
            session,
            SharedSubjects::new(),
            tx,
            Duration::from_millis(5),
        );

        assert!(handle.is_running());
        handle.disconnect();
        assert!(!handle.is_running());

        // The loop must have announced its shutdown.
        let mut saw_disconnected = false;
        while let Some(event) = rx.blocking_recv() {
            if event == StreamEvent::Disconnected {
                saw_disconnected = true;
            }
        }
        assert!(saw_disconnected);
        drop(accepted);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let session = test_session(&listener);
        let (_accepted, _) = listener.accept().unwrap();

        let (tx, _rx) = mpsc::channel(64);
        let mut handle = start_streaming(
            session,
            SharedSubjects::new(),
            tx,
            Duration::from_millis(5),
        );

        handle.disconnect();
        handle.disconnect();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_peer_close_ends_the_session() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let session = test_session(&listener);
        let (accepted, _) = listener.accept().unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let _handle = start_streaming(
            session,
            SharedSubjects::new(),
            tx,
            Duration::from_millis(5),
        );

        // Close the collector side; the loop must hit a send error and stop.
        drop(accepted);

        let mut saw_disconnected = false;
        while let Some(event) = rx.blocking_recv() {
            if event == StreamEvent::Disconnected {
                saw_disconnected = true;
                break;
            }
        }
        assert!(saw_disconnected);
    }

    #[test]
    fn test_tracked_subject_count_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let session = test_session(&listener);
        let (_accepted, _) = listener.accept().unwrap();

        let shared = SharedSubjects::new();
        shared.publish(MockCaptureSource::standing_figure(4).subjects());

        let (tx, mut rx) = mpsc::channel(64);
        let mut handle =
            start_streaming(session, shared, tx, Duration::from_millis(5));

        let mut saw_count = false;
        while let Some(event) = rx.blocking_recv() {
            if event == StreamEvent::TrackedSubjects(1) {
                saw_count = true;
                break;
            }
        }
        assert!(saw_count);
        handle.disconnect();
    }

    #[test]
    fn test_connect_session_rejects_concurrent_scans() {
        let state = ClientAppState::new();
        state.scan_in_progress.store(true, Ordering::Release);

        let (tx, _rx) = mpsc::channel(64);
        let result = connect_session(&NetworkConfig::default(), &state, &tx);

        assert!(matches!(
            result,
            Err(ConnectError::Scan(ScanError::ScanInProgress))
        ));
    }

    #[test]
    fn test_connect_session_rejects_bad_address() {
        let state = ClientAppState::new();
        let config = NetworkConfig {
            local_address: "not-an-address".to_string(),
            ..NetworkConfig::default()
        };

        let (tx, _rx) = mpsc::channel(64);
        let result = connect_session(&config, &state, &tx);

        assert!(matches!(result, Err(ConnectError::InvalidAddress(_))));
        // The guard must have been released for the next attempt.
        assert!(!state.scan_in_progress.load(Ordering::Acquire));
    }

    #[test]
    fn test_failed_scan_reports_search_unsuccessful() {
        // A /30 around 127.0.0.1 probes two candidates on a dead port.
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        let dead_port = probe.local_addr().unwrap().port();
        drop(probe);

        let state = ClientAppState::new();
        let config = NetworkConfig {
            port: dead_port,
            local_address: "127.0.0.1".to_string(),
            subnet_mask: "255.255.255.252".to_string(),
            connect_timeout_ms: 100,
            ..NetworkConfig::default()
        };

        let (tx, mut rx) = mpsc::channel(64);
        let result = connect_session(&config, &state, &tx);

        assert!(matches!(
            result,
            Err(ConnectError::Scan(ScanError::NoPeerFound { tried: 2 }))
        ));
        assert!(!state.scan_in_progress.load(Ordering::Acquire));

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let StreamEvent::StatusChanged(line) = event {
                statuses.push(line);
            }
        }
        assert_eq!(statuses, vec!["Searching...", "Search unsuccessful."]);
    }
}
