//! Wire protocol: message model and the self-describing binary codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_message, CodecError};
pub use messages::{DataMessage, MessageKind, PoseMessage, SubjectRecord, TimeSyncMessage};
