//! Per-subject calibration and stillness state machine.
//!
//! The tracker carries one persistent [`SubjectState`] per tracking id and
//! advances it once per capture tick from the new [`SubjectSnapshot`].  The
//! calibration cycle encodes a "raise hand, hold still to arm, lower hand to
//! confirm" gesture:
//!
//! ```text
//! Uncalibrated ──hand raised──▶ RaisedHand ──stood still──▶ (gesture fires)
//!      ▲                            │                            │
//!      └──────hand lowered────── SavedPose ◀────next tick────────┘
//! ```
//!
//! The gesture fires on exactly one tick per cycle: the tick on which the
//! subject first stands still while holding a hand up.  The tick after that
//! advances to `SavedPose`, which persists until the hand is lowered.
//!
//! All functions here are pure; the only state is the per-id map of previous
//! frames.  Keying by tracking id (rather than by position in the sensor's
//! body array) keeps subjects stable when bodies appear or disappear between
//! ticks.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::skeleton::{Joint, JointKind, SubjectSnapshot, TrackingConfidence};

/// Joints that must be at full tracking confidence before a frame is
/// eligible for the stillness comparison.
pub const IMPORTANT_JOINTS: [JointKind; 8] = [
    JointKind::Neck,
    JointKind::SpineMid,
    JointKind::ShoulderLeft,
    JointKind::ShoulderRight,
    JointKind::Head,
    JointKind::HandLeft,
    JointKind::HandRight,
    JointKind::SpineBase,
];

/// Upper bound on the summed squared joint displacement (metres²) for a
/// frame pair to classify as standing still.
pub const MOVING_DISTANCE_EPSILON: f32 = 0.01;

/// Whether the subject moved between the previous and current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovingState {
    Moving,
    Stand,
}

/// Progress through the calibration gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationState {
    Uncalibrated,
    RaisedHand,
    SavedPose,
}

/// Which hand, if any, is above the subject's head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaisedHand {
    None,
    Left,
    Right,
}

/// Derived per-subject state, carried forward between ticks and written to
/// every outgoing `Data` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectState {
    pub moving_state: MovingState,
    pub calibration_state: CalibrationState,
    pub raised_hand: RaisedHand,
    pub gesture_detected: bool,
}

/// Result of advancing the tracker one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickUpdate {
    /// Derived state for each input snapshot, in input order.
    pub states: Vec<SubjectState>,
    /// Tracking ids whose calibration gesture fired this tick.
    pub gestures: Vec<u64>,
}

/// Last frame retained per tracking id.
#[derive(Debug, Clone)]
struct PreviousFrame {
    joints: BTreeMap<JointKind, Joint>,
    state: SubjectState,
}

/// Maintains the per-subject state machine across consecutive ticks.
///
/// Entries for ids the sensor stops reporting are simply not advanced; they
/// keep their last state until the sensor reuses or retires the id.
#[derive(Debug, Default)]
pub struct SubjectTracker {
    previous: HashMap<u64, PreviousFrame>,
}

impl SubjectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances every subject present in `snapshots` and returns the derived
    /// states plus the ids whose gesture fired.
    pub fn advance(&mut self, snapshots: &[SubjectSnapshot]) -> TickUpdate {
        let mut states = Vec::with_capacity(snapshots.len());
        let mut gestures = Vec::new();

        for snapshot in snapshots {
            let previous = self.previous.get(&snapshot.tracking_id);
            let moving_state = classify_movement(previous.map(|p| &p.joints), snapshot);

            let state = match previous {
                // First sighting: no gesture evaluation until a previous
                // frame exists to compare against.
                None => SubjectState {
                    moving_state,
                    calibration_state: CalibrationState::Uncalibrated,
                    raised_hand: RaisedHand::None,
                    gesture_detected: false,
                },
                Some(prev) => {
                    let hand_test = raised_hand(snapshot);
                    let (calibration_state, raised, fired) =
                        transition(&prev.state, hand_test, moving_state);
                    if fired {
                        debug!("gesture armed for subject {}", snapshot.tracking_id);
                        gestures.push(snapshot.tracking_id);
                    }
                    SubjectState {
                        moving_state,
                        calibration_state,
                        raised_hand: raised,
                        gesture_detected: fired,
                    }
                }
            };

            self.previous.insert(
                snapshot.tracking_id,
                PreviousFrame {
                    joints: snapshot.joints.clone(),
                    state,
                },
            );
            states.push(state);
        }

        TickUpdate { states, gestures }
    }

    /// The last derived state for a tracking id, if the id has been seen.
    pub fn last_state(&self, tracking_id: u64) -> Option<&SubjectState> {
        self.previous.get(&tracking_id).map(|p| &p.state)
    }

    /// Number of ids with retained state.
    pub fn tracked_count(&self) -> usize {
        self.previous.len()
    }
}

/// One step of the calibration state machine.
///
/// `hand_test` is the hand-raise test evaluated on the *current* frame;
/// `moving` is the stillness classification for the current frame.  Returns
/// the next calibration state, the hand to report, and whether the gesture
/// fired on this tick.
fn transition(
    previous: &SubjectState,
    hand_test: RaisedHand,
    moving: MovingState,
) -> (CalibrationState, RaisedHand, bool) {
    match previous.calibration_state {
        // Waiting for a hand to go up.
        CalibrationState::Uncalibrated => match hand_test {
            RaisedHand::None => (CalibrationState::Uncalibrated, RaisedHand::None, false),
            hand => (CalibrationState::RaisedHand, hand, false),
        },

        // Hand is up; waiting for the subject to stand still.
        CalibrationState::RaisedHand => {
            if previous.gesture_detected {
                // The gesture fired last tick; advance to the saved pose.
                return (CalibrationState::SavedPose, previous.raised_hand, false);
            }
            match moving {
                MovingState::Stand => {
                    // Armed: fires exactly once per cycle.
                    (CalibrationState::RaisedHand, previous.raised_hand, true)
                }
                MovingState::Moving => match hand_test {
                    RaisedHand::None => {
                        (CalibrationState::Uncalibrated, RaisedHand::None, false)
                    }
                    hand => (CalibrationState::RaisedHand, hand, false),
                },
            }
        }

        // Pose saved; lowering the hand restarts the cycle.
        CalibrationState::SavedPose => match hand_test {
            RaisedHand::None => (CalibrationState::Uncalibrated, RaisedHand::None, false),
            hand => (CalibrationState::SavedPose, hand, false),
        },
    }
}

/// Classifies whether the subject moved since the previous frame.
///
/// A subject with no previous frame, without a positive track, or with any
/// important joint below full confidence is always `Moving`: the displacement
/// sum is only meaningful between two well-observed frames.
fn classify_movement(
    previous_joints: Option<&BTreeMap<JointKind, Joint>>,
    snapshot: &SubjectSnapshot,
) -> MovingState {
    let Some(previous_joints) = previous_joints else {
        return MovingState::Moving;
    };
    if !snapshot.is_tracked {
        return MovingState::Moving;
    }

    for kind in IMPORTANT_JOINTS {
        match snapshot.joint(kind) {
            Some(joint) if joint.confidence == TrackingConfidence::Tracked => {}
            _ => return MovingState::Moving,
        }
    }

    let mut square_distance_sum = 0.0f32;
    for (kind, joint) in &snapshot.joints {
        if let Some(prev) = previous_joints.get(kind) {
            square_distance_sum += joint.square_distance(prev);
        }
    }
    trace!(
        "subject {} moved {square_distance_sum} (squared) since last frame",
        snapshot.tracking_id
    );

    if square_distance_sum <= MOVING_DISTANCE_EPSILON {
        MovingState::Stand
    } else {
        MovingState::Moving
    }
}

/// Tests whether a hand is above the head on the current frame.
///
/// The right hand takes priority when both hands are up.  Missing head or
/// hand joints test as not raised.
fn raised_hand(snapshot: &SubjectSnapshot) -> RaisedHand {
    if !snapshot.is_tracked {
        return RaisedHand::None;
    }

    let Some(head) = snapshot.joint(JointKind::Head) else {
        return RaisedHand::None;
    };

    if let Some(right) = snapshot.joint(JointKind::HandRight) {
        if right.y > head.y {
            return RaisedHand::Right;
        }
    }
    if let Some(left) = snapshot.joint(JointKind::HandLeft) {
        if left.y > head.y {
            return RaisedHand::Left;
        }
    }

    RaisedHand::None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
