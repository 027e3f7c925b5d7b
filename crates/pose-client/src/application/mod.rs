//! Application layer: use cases for the client.

pub mod stream;
