//! All PoseStream wire message types.
//!
//! Two message kinds travel over the TCP stream: `TimeSync`, exchanged during
//! the clock-synchronization handshake, and `Data`, streamed once per tick
//! thereafter.  Field names are preserved on the wire (camelCase), so the
//! collector can decode by name and both sides may evolve independently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::skeleton::{Joint, JointKind, SubjectSnapshot};
use crate::domain::tracker::SubjectState;

/// Discriminates the two message kinds without inspecting the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    TimeSync,
    Data,
}

/// Clock-synchronization handshake message.
///
/// Carries the sender's *raw* local clock reading; the offset correction is
/// never applied to handshake timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSyncMessage {
    /// The sender's local socket address, e.g. `"192.168.1.17:49152"`.
    pub address: String,
    /// Microseconds since the Unix epoch on the sender's clock.
    pub timestamp: i64,
}

/// One subject's entry in a `Data` message: identity, the full joint set,
/// and the four derived state fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub tracking_id: u64,
    pub is_tracked: bool,
    #[serde(flatten)]
    pub state: SubjectState,
    /// All joints, keyed by wire joint name.
    pub joints: BTreeMap<JointKind, Joint>,
}

impl SubjectRecord {
    /// Pairs a capture snapshot with its derived state for transmission.
    pub fn from_snapshot(snapshot: &SubjectSnapshot, state: SubjectState) -> Self {
        Self {
            tracking_id: snapshot.tracking_id,
            is_tracked: snapshot.is_tracked,
            state,
            joints: snapshot.joints.clone(),
        }
    }
}

/// Steady-state telemetry message, streamed once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMessage {
    /// The sender's local socket address.
    pub address: String,
    /// Offset-adjusted microseconds since the Unix epoch, approximating the
    /// collector's clock.
    pub timestamp: i64,
    /// One record per subject reported by the capture device this tick.
    pub subjects: Vec<SubjectRecord>,
}

/// All valid PoseStream messages, discriminated by the `kind` wire field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PoseMessage {
    TimeSync(TimeSyncMessage),
    Data(DataMessage),
}

impl PoseMessage {
    /// Builds a handshake message carrying the raw local timestamp.
    pub fn time_sync(address: impl Into<String>, timestamp: i64) -> Self {
        PoseMessage::TimeSync(TimeSyncMessage {
            address: address.into(),
            timestamp,
        })
    }

    /// Builds a telemetry message for one tick.
    pub fn data(address: impl Into<String>, timestamp: i64, subjects: Vec<SubjectRecord>) -> Self {
        PoseMessage::Data(DataMessage {
            address: address.into(),
            timestamp,
            subjects,
        })
    }

    /// Returns the [`MessageKind`] discriminant for this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            PoseMessage::TimeSync(_) => MessageKind::TimeSync,
            PoseMessage::Data(_) => MessageKind::Data,
        }
    }

    /// The timestamp field common to both kinds.
    pub fn timestamp(&self) -> i64 {
        match self {
            PoseMessage::TimeSync(m) => m.timestamp,
            PoseMessage::Data(m) => m.timestamp,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
