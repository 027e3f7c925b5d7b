//! Benchmarks for the wire codec: encoding and decoding a `Data` message
//! carrying full 25-joint skeletons, the shape sent 24 times per second.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pose_core::{
    decode_message, encode_message,
    domain::skeleton::{Joint, JointKind, SubjectSnapshot, TrackingConfidence},
    domain::tracker::{CalibrationState, MovingState, RaisedHand, SubjectState},
    protocol::messages::SubjectRecord,
    PoseMessage,
};

fn full_skeleton_message(subject_count: u64) -> PoseMessage {
    let state = SubjectState {
        moving_state: MovingState::Stand,
        calibration_state: CalibrationState::SavedPose,
        raised_hand: RaisedHand::None,
        gesture_detected: false,
    };
    let subjects = (0..subject_count)
        .map(|id| {
            let mut snapshot = SubjectSnapshot::new(id, true);
            for (i, kind) in JointKind::ALL.into_iter().enumerate() {
                snapshot.joints.insert(
                    kind,
                    Joint::new(
                        0.01 * i as f32,
                        1.0 + 0.02 * i as f32,
                        2.5,
                        TrackingConfidence::Tracked,
                    ),
                );
            }
            SubjectRecord::from_snapshot(&snapshot, state)
        })
        .collect();
    PoseMessage::data("192.168.1.17:50404", 1_712_345_678_901_234, subjects)
}

fn bench_encode(c: &mut Criterion) {
    let msg = full_skeleton_message(2);
    c.bench_function("encode_data_two_subjects", |b| {
        b.iter(|| encode_message(black_box(&msg)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode_message(&full_skeleton_message(2)).unwrap();
    c.bench_function("decode_data_two_subjects", |b| {
        b.iter(|| decode_message(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
