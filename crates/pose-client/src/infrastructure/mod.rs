//! Infrastructure layer: OS-facing adapters for the client application.

pub mod capture;
pub mod network;
pub mod storage;
pub mod ui_bridge;
