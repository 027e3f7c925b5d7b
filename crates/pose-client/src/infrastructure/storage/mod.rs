//! Persistence: TOML configuration for the client.

pub mod config;
