//! # pose-core
//!
//! Shared library for PoseStream containing the wire message model, the
//! self-describing binary codec, the per-subject calibration state machine,
//! and subnet host enumeration.
//!
//! This crate is used by the capture-side client and by any collector that
//! wants to decode the stream.  It has zero dependencies on OS APIs, UI
//! frameworks, or network sockets.
//!
//! # Architecture overview
//!
//! PoseStream sends one message per capture tick from the machine attached to
//! the depth sensor to a collector elsewhere on the LAN.  This crate defines:
//!
//! - **`protocol`** – How bytes travel over the network.  Messages are
//!   serialized as self-describing MessagePack documents (field names
//!   preserved on the wire) so sender and collector can evolve independently.
//!
//! - **`domain`** – Pure business logic with no OS dependencies: the skeleton
//!   joint model and the `SubjectTracker`, which derives each subject's
//!   stillness classification and calibration/gesture state from consecutive
//!   frames.
//!
//! - **`subnet`** – Enumeration of candidate host addresses on the local
//!   subnet, used by the client to locate the collector without manual
//!   configuration.

pub mod domain;
pub mod protocol;
pub mod subnet;

// Re-export the most-used types at the crate root so callers can write
// `pose_core::PoseMessage` instead of `pose_core::protocol::messages::PoseMessage`.
pub use domain::skeleton::{Joint, JointKind, SubjectSnapshot, TrackingConfidence};
pub use domain::tracker::{
    CalibrationState, MovingState, RaisedHand, SubjectState, SubjectTracker, TickUpdate,
};
pub use protocol::codec::{decode_message, encode_message, CodecError};
pub use protocol::messages::{PoseMessage, SubjectRecord};
pub use subnet::{host_addresses, SubnetError};
