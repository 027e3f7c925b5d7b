//! Capture seam: the shared subject buffer and the sensor adapter trait.
//!
//! The real sensor SDK delivers body frames on its own callback thread; the
//! streaming loop samples whatever is current on its own cadence.  The two
//! meet in [`SharedSubjects`], the single piece of mutable state they share.
//!
//! Both directions copy under the lock: `publish` moves a fresh vector in,
//! and `snapshot` clones a fully-independent vector out before releasing the
//! lock, so the state machine never observes a partially-updated subject
//! list.
//!
//! A [`MockCaptureSource`] is always compiled (not guarded by `#[cfg]`) so
//! tests and sensorless demo runs work on any machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use pose_core::{Joint, JointKind, SubjectSnapshot, TrackingConfidence};
use tracing::info;

/// The "current subjects" buffer shared between the capture thread and the
/// streaming loop.
#[derive(Debug, Clone, Default)]
pub struct SharedSubjects {
    inner: Arc<Mutex<Vec<SubjectSnapshot>>>,
}

impl SharedSubjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the buffer contents with this tick's subjects.
    pub fn publish(&self, subjects: Vec<SubjectSnapshot>) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = subjects;
    }

    /// Returns a private, fully-independent copy of the current subjects.
    pub fn snapshot(&self) -> Vec<SubjectSnapshot> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}

/// Adapter trait for whatever produces body frames.
///
/// The production implementation wraps the sensor SDK; the mock below
/// synthesizes figures.  No cadence is promised; the pump thread decides
/// how often to poll.
pub trait CaptureSource: Send + Sync {
    /// The subjects visible to the sensor right now.
    fn subjects(&self) -> Vec<SubjectSnapshot>;
}

/// A capture source that returns a fixed set of synthetic subjects.
///
/// # Example
///
/// ```ignore
/// let source = MockCaptureSource::standing_figure(1);
/// assert_eq!(source.subjects().len(), 1);
/// ```
pub struct MockCaptureSource {
    pub subjects: Vec<SubjectSnapshot>,
}

impl MockCaptureSource {
    /// One fully-tracked subject standing with hands at waist height.
    pub fn standing_figure(tracking_id: u64) -> Self {
        Self {
            subjects: vec![synthetic_figure(tracking_id, false)],
        }
    }

    /// One fully-tracked subject holding the right hand above the head,
    /// the pose that starts the calibration gesture.
    pub fn right_hand_raised(tracking_id: u64) -> Self {
        Self {
            subjects: vec![synthetic_figure(tracking_id, true)],
        }
    }

    /// No subjects in view.
    pub fn empty() -> Self {
        Self { subjects: vec![] }
    }
}

impl CaptureSource for MockCaptureSource {
    fn subjects(&self) -> Vec<SubjectSnapshot> {
        self.subjects.clone()
    }
}

/// Builds a plausible full 25-joint skeleton at ~2.4 m from the sensor.
fn synthetic_figure(tracking_id: u64, right_hand_raised: bool) -> SubjectSnapshot {
    const HEAD_Y: f32 = 1.68;
    let mut snapshot = SubjectSnapshot::new(tracking_id, true);
    for kind in JointKind::ALL {
        let (x, y) = match kind {
            JointKind::Head => (0.0, HEAD_Y),
            JointKind::Neck => (0.0, 1.55),
            JointKind::SpineShoulder => (0.0, 1.45),
            JointKind::SpineMid => (0.0, 1.15),
            JointKind::SpineBase => (0.0, 0.90),
            JointKind::ShoulderLeft => (-0.20, 1.45),
            JointKind::ShoulderRight => (0.20, 1.45),
            JointKind::ElbowLeft => (-0.28, 1.18),
            JointKind::ElbowRight => (0.28, 1.18),
            JointKind::WristLeft | JointKind::HandLeft => (-0.30, 0.95),
            JointKind::WristRight | JointKind::HandRight if right_hand_raised => {
                (0.25, HEAD_Y + 0.35)
            }
            JointKind::WristRight | JointKind::HandRight => (0.30, 0.95),
            JointKind::HandTipLeft | JointKind::ThumbLeft => (-0.32, 0.90),
            JointKind::HandTipRight | JointKind::ThumbRight if right_hand_raised => {
                (0.25, HEAD_Y + 0.42)
            }
            JointKind::HandTipRight | JointKind::ThumbRight => (0.32, 0.90),
            JointKind::HipLeft => (-0.12, 0.88),
            JointKind::HipRight => (0.12, 0.88),
            JointKind::KneeLeft => (-0.14, 0.50),
            JointKind::KneeRight => (0.14, 0.50),
            JointKind::AnkleLeft => (-0.15, 0.10),
            JointKind::AnkleRight => (0.15, 0.10),
            JointKind::FootLeft => (-0.15, 0.05),
            JointKind::FootRight => (0.15, 0.05),
        };
        snapshot
            .joints
            .insert(kind, Joint::new(x, y, 2.4, TrackingConfidence::Tracked));
    }
    snapshot
}

/// Spawns the capture pump: a dedicated thread that polls `source` and
/// publishes into `shared` until `running` is cleared.
pub fn start_capture_pump(
    source: Arc<dyn CaptureSource>,
    shared: SharedSubjects,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("pose-capture".to_string())
        .spawn(move || {
            info!("capture pump started");
            while running.load(Ordering::Relaxed) {
                shared.publish(source.subjects());
                std::thread::sleep(poll_interval);
            }
            info!("capture pump stopped");
        })
        .expect("failed to spawn capture thread")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
