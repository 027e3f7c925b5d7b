//! Presentation bridge: status events and a polled state mirror.
//!
//! The core never renders anything.  It reports through two narrow surfaces:
//!
//! - [`StreamEvent`]: pushed over an `mpsc` channel as things happen; the
//!   presentation layer turns `StatusChanged` into status text and
//!   `GestureConfirmed` into a one-shot visual acknowledgment.
//! - [`ClientAppState`]: a mirror the UI can poll at its own rate for the
//!   current connection status, last status line, and tracked-subject count.
//!
//! All mirror fields use `tokio::sync::Mutex` because the event dispatch
//! loop in `main` is async; holding a `std::sync::Mutex` guard across an
//! `.await` point would block the runtime's worker thread.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// The streaming state machine's externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No session; a scan may be started.
    Idle,
    /// A discovery scan is running.
    Searching,
    /// Connected, clock-synced, and ticking.
    Streaming,
}

/// Notifications pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Free-text human-readable status line.
    StatusChanged(String),
    /// A session was established with the collector.
    Connected { peer: SocketAddr },
    /// The calibration gesture fired for a subject.  One-shot: emitted on
    /// exactly the tick the gesture arms.
    GestureConfirmed { tracking_id: u64 },
    /// The number of tracked subjects changed.
    TrackedSubjects(usize),
    /// The session ended (disconnect request or transport failure).
    Disconnected,
}

/// Runtime state shared with the presentation layer.
pub struct ClientAppState {
    /// Current streaming state.
    pub connection_status: Mutex<ConnectionStatus>,
    /// Last status line emitted.
    pub status_line: Mutex<String>,
    /// Number of subjects the tracker currently holds state for.
    pub tracked_subjects: Mutex<usize>,
    /// Guards the one-scan-at-a-time rule.
    pub scan_in_progress: AtomicBool,
}

impl ClientAppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Default for ClientAppState {
    fn default() -> Self {
        Self {
            connection_status: Mutex::new(ConnectionStatus::Idle),
            status_line: Mutex::new(String::new()),
            tracked_subjects: Mutex::new(0),
            scan_in_progress: AtomicBool::new(false),
        }
    }
}

/// Serializable snapshot of [`ClientAppState`] for a polling UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDto {
    pub connection_status: String,
    pub status_line: String,
    pub tracked_subjects: usize,
}

/// Produces a [`StatusDto`] from the live state.
pub async fn status_snapshot(state: &ClientAppState) -> StatusDto {
    let status = state.connection_status.lock().await;
    let line = state.status_line.lock().await;
    let tracked = state.tracked_subjects.lock().await;

    StatusDto {
        connection_status: format!("{status:?}"),
        status_line: line.clone(),
        tracked_subjects: *tracked,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let state = ClientAppState::new();
        let dto = status_snapshot(&state).await;
        assert_eq!(dto.connection_status, "Idle");
        assert_eq!(dto.status_line, "");
        assert_eq!(dto.tracked_subjects, 0);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_updates() {
        let state = ClientAppState::new();
        {
            let mut status = state.connection_status.lock().await;
            *status = ConnectionStatus::Streaming;
        }
        {
            let mut line = state.status_line.lock().await;
            *line = "Client connected to: 192.168.1.10:8000.".to_string();
        }
        {
            let mut tracked = state.tracked_subjects.lock().await;
            *tracked = 2;
        }

        let dto = status_snapshot(&state).await;
        assert_eq!(dto.connection_status, "Streaming");
        assert_eq!(dto.tracked_subjects, 2);
        assert!(dto.status_line.starts_with("Client connected"));
    }

    #[test]
    fn test_gesture_event_carries_tracking_id() {
        let event = StreamEvent::GestureConfirmed { tracking_id: 42 };
        if let StreamEvent::GestureConfirmed { tracking_id } = event {
            assert_eq!(tracking_id, 42);
        } else {
            panic!("unexpected event variant");
        }
    }
}
