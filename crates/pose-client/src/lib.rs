//! pose-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! # What does pose-client do?
//!
//! The client runs on the machine attached to the depth sensor.  It:
//!
//! 1. Enumerates the local subnet and probes each host in order until one
//!    accepts a TCP connection on the collector port.
//! 2. Runs a three-round clock-synchronization handshake so that outgoing
//!    timestamps approximate the collector's clock.
//! 3. Starts a 24 Hz streaming loop: each tick it copies the current subject
//!    snapshots out of the shared capture buffer, advances the per-subject
//!    calibration state machine, and sends one `Data` document.
//! 4. Surfaces status changes and one-shot gesture confirmations to the
//!    presentation layer over an event channel.

/// Application layer: the connect-and-stream use case.
pub mod application;

/// Infrastructure layer: sockets, capture seam, configuration, and UI bridge.
pub mod infrastructure;
