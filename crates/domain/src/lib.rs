//! Shared types for SessionGate: configuration, the common error type and
//! structured trace events.

pub mod config;
pub mod error;
pub mod trace;
