//! Synchronization primitives.
//!
//! Thin mutex wrapper over std or parking_lot, statistics gauges, and the
//! binary [`SignalGate`](signal::SignalGate) used by the upload pipeline.

pub(crate) mod atomics;
pub(crate) mod mutex;
pub mod signal;
