//! Configuration and statistics types.

pub mod config;
pub mod stats;
