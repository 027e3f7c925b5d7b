//! Skeleton joint model shared by the capture seam, the state machine, and
//! the wire format.
//!
//! A *subject* is one tracked human body.  Each capture tick the sensor
//! reports, per subject, a 3-D camera-space position and a tracking
//! confidence for every joint in the skeleton.  Positions are metres in
//! camera space; the vertical axis is `y`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// All joints of the tracked skeleton.
///
/// The variant name is the joint's wire name: the `joints` map in a `Data`
/// message is keyed by these strings, so renaming a variant is a wire-format
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JointKind {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointKind {
    /// Every joint, in sensor reporting order.
    pub const ALL: [JointKind; 25] = [
        JointKind::SpineBase,
        JointKind::SpineMid,
        JointKind::Neck,
        JointKind::Head,
        JointKind::ShoulderLeft,
        JointKind::ElbowLeft,
        JointKind::WristLeft,
        JointKind::HandLeft,
        JointKind::ShoulderRight,
        JointKind::ElbowRight,
        JointKind::WristRight,
        JointKind::HandRight,
        JointKind::HipLeft,
        JointKind::KneeLeft,
        JointKind::AnkleLeft,
        JointKind::FootLeft,
        JointKind::HipRight,
        JointKind::KneeRight,
        JointKind::AnkleRight,
        JointKind::FootRight,
        JointKind::SpineShoulder,
        JointKind::HandTipLeft,
        JointKind::ThumbLeft,
        JointKind::HandTipRight,
        JointKind::ThumbRight,
    ];
}

/// Per-joint tracking confidence reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingConfidence {
    /// The joint was not observed this frame.
    NotTracked,
    /// The joint position was inferred from neighbouring joints.
    Inferred,
    /// The joint was directly observed at full confidence.
    Tracked,
}

/// One joint sample: camera-space position plus tracking confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Joint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(rename = "trackingConfidence")]
    pub confidence: TrackingConfidence,
}

impl Joint {
    pub fn new(x: f32, y: f32, z: f32, confidence: TrackingConfidence) -> Self {
        Self { x, y, z, confidence }
    }

    /// Squared Euclidean distance to another joint sample.
    ///
    /// Squared (not rooted) because the movement classifier compares an
    /// accumulated sum against a squared-distance epsilon.
    pub fn square_distance(&self, other: &Joint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

/// One tracked subject's joints for a single capture tick.
///
/// Produced by the capture collaborator and read-only to the core; the
/// tracking id is stable for as long as the sensor keeps sight of the
/// subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectSnapshot {
    /// Sensor-assigned stable identifier for this body.
    pub tracking_id: u64,
    /// Whether the sensor currently has a positive lock on the body.
    pub is_tracked: bool,
    /// All reported joints.  A `BTreeMap` keeps wire output deterministic.
    pub joints: BTreeMap<JointKind, Joint>,
}

impl SubjectSnapshot {
    /// Creates an empty snapshot for the given id.
    pub fn new(tracking_id: u64, is_tracked: bool) -> Self {
        Self {
            tracking_id,
            is_tracked,
            joints: BTreeMap::new(),
        }
    }

    /// Builder-style helper used by capture adapters and tests.
    pub fn with_joint(mut self, kind: JointKind, joint: Joint) -> Self {
        self.joints.insert(kind, joint);
        self
    }

    pub fn joint(&self, kind: JointKind) -> Option<&Joint> {
        self.joints.get(&kind)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_distance_is_zero_for_identical_joints() {
        let j = Joint::new(0.5, 1.2, 2.0, TrackingConfidence::Tracked);
        assert_eq!(j.square_distance(&j), 0.0);
    }

    #[test]
    fn test_square_distance_sums_all_three_axes() {
        let a = Joint::new(0.0, 0.0, 0.0, TrackingConfidence::Tracked);
        let b = Joint::new(1.0, 2.0, 2.0, TrackingConfidence::Tracked);
        assert_eq!(a.square_distance(&b), 9.0);
    }

    #[test]
    fn test_all_joint_kinds_are_distinct() {
        let mut kinds: Vec<JointKind> = JointKind::ALL.to_vec();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 25);
    }

    #[test]
    fn test_snapshot_joint_lookup() {
        let snapshot = SubjectSnapshot::new(7, true).with_joint(
            JointKind::Head,
            Joint::new(0.0, 1.7, 2.0, TrackingConfidence::Tracked),
        );

        assert!(snapshot.joint(JointKind::Head).is_some());
        assert!(snapshot.joint(JointKind::FootLeft).is_none());
    }
}
