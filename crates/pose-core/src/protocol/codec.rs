//! Self-describing binary codec for PoseStream messages.
//!
//! Messages are MessagePack documents serialized in *named* mode: structs
//! become maps with their field names as keys, so the wire format carries its
//! own schema.  This costs bytes compared to a fixed binary layout, but lets
//! the collector decode by field name and tolerate additive evolution.
//!
//! There is no length prefix or delimiter between documents.  A receiver must
//! consume exactly one document per read; [`decode_message`] therefore fails
//! fast with [`CodecError::TrailingBytes`] when the buffer holds anything
//! beyond the first document, rather than treating the surplus as a second
//! pending message.

use std::io::Cursor;

use serde::Deserialize;
use thiserror::Error;

use crate::protocol::messages::PoseMessage;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The buffer does not contain a valid message document.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The buffer held more bytes than one decoded document accounts for.
    #[error("{trailing} bytes remain after one decoded document")]
    TrailingBytes { trailing: usize },
}

/// Encodes a [`PoseMessage`] as one self-describing MessagePack document.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use pose_core::protocol::{encode_message, decode_message};
/// use pose_core::protocol::messages::PoseMessage;
///
/// let msg = PoseMessage::time_sync("127.0.0.1:8000", 1_700_000_000_000_000);
/// let bytes = encode_message(&msg).unwrap();
/// let decoded = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// ```
pub fn encode_message(msg: &PoseMessage) -> Result<Vec<u8>, CodecError> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

/// Decodes exactly one [`PoseMessage`] document from `bytes`.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed input, and
/// [`CodecError::TrailingBytes`] if any bytes remain after the first
/// document (the fail-fast framing contract).
pub fn decode_message(bytes: &[u8]) -> Result<PoseMessage, CodecError> {
    let mut cursor = Cursor::new(bytes);
    let msg = {
        let mut deserializer = rmp_serde::Deserializer::new(&mut cursor);
        PoseMessage::deserialize(&mut deserializer)?
    };

    let consumed = cursor.position() as usize;
    if consumed < bytes.len() {
        return Err(CodecError::TrailingBytes {
            trailing: bytes.len() - consumed,
        });
    }
    Ok(msg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::skeleton::{Joint, JointKind, SubjectSnapshot, TrackingConfidence};
    use crate::domain::tracker::{CalibrationState, MovingState, RaisedHand, SubjectState};
    use crate::protocol::messages::SubjectRecord;

    fn sample_record(tracking_id: u64) -> SubjectRecord {
        let snapshot = SubjectSnapshot::new(tracking_id, true)
            .with_joint(
                JointKind::Head,
                Joint::new(0.03, 1.71, 2.44, TrackingConfidence::Tracked),
            )
            .with_joint(
                JointKind::HandRight,
                Joint::new(0.25, 1.02, 2.41, TrackingConfidence::Inferred),
            );
        SubjectRecord::from_snapshot(
            &snapshot,
            SubjectState {
                moving_state: MovingState::Moving,
                calibration_state: CalibrationState::Uncalibrated,
                raised_hand: RaisedHand::None,
                gesture_detected: false,
            },
        )
    }

    #[test]
    fn test_time_sync_round_trip() {
        let msg = PoseMessage::time_sync("192.168.1.17:49152", 1_712_000_000_123_456);
        let bytes = encode_message(&msg).unwrap();
        assert_eq!(decode_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_data_round_trip_preserves_all_fields() {
        let msg = PoseMessage::data(
            "192.168.1.17:49152",
            1_712_000_000_123_456,
            vec![sample_record(1), sample_record(72057594037927941)],
        );

        let bytes = encode_message(&msg).unwrap();
        let decoded = decode_message(&bytes).unwrap();

        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_data_round_trip_with_no_subjects() {
        let msg = PoseMessage::data("10.0.0.5:8000", 0, vec![]);
        let bytes = encode_message(&msg).unwrap();
        assert_eq!(decode_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_encoded_document_carries_field_names() {
        // Named mode is the wire contract: the raw bytes must contain the
        // field-name strings, not positional arrays.
        let msg = PoseMessage::data("10.0.0.5:8000", 7, vec![sample_record(3)]);
        let bytes = encode_message(&msg).unwrap();

        for name in ["kind", "trackingId", "movingState", "joints", "trackingConfidence"] {
            assert!(
                bytes
                    .windows(name.len())
                    .any(|w| w == name.as_bytes()),
                "encoded document must contain the field name {name:?}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_are_a_protocol_violation() {
        let msg = PoseMessage::time_sync("10.0.0.5:8000", 99);
        let mut bytes = encode_message(&msg).unwrap();
        bytes.extend_from_slice(&[0x00, 0x01, 0x02]);

        let result = decode_message(&bytes);
        assert!(matches!(
            result,
            Err(CodecError::TrailingBytes { trailing: 3 })
        ));
    }

    #[test]
    fn test_two_concatenated_documents_are_rejected() {
        let mut bytes = encode_message(&PoseMessage::time_sync("a", 1)).unwrap();
        bytes.extend(encode_message(&PoseMessage::time_sync("b", 2)).unwrap());

        assert!(matches!(
            decode_message(&bytes),
            Err(CodecError::TrailingBytes { .. })
        ));
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result = decode_message(&[0xC1, 0xFF, 0x00]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_empty_buffer_returns_decode_error() {
        assert!(matches!(decode_message(&[]), Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_float_precision_survives_round_trip() {
        let mut record = sample_record(1);
        record.joints.insert(
            JointKind::SpineBase,
            Joint::new(
                f32::MIN_POSITIVE,
                -0.000123456,
                1234.5678,
                TrackingConfidence::NotTracked,
            ),
        );
        let msg = PoseMessage::data("a", i64::MIN, vec![record]);

        let bytes = encode_message(&msg).unwrap();
        assert_eq!(decode_message(&bytes).unwrap(), msg);
    }
}
