//! Debug utilities for leak hunting.
//!
//! Only available with the `debug` feature.

pub mod backtrace;
