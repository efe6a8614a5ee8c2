//! Diagnostics.
//!
//! This module provides:
//! - **Runtime diagnostics**: coded messages for protocol violations,
//!   device failures and teardown leaks
//! - **Strict mode**: optional panic-on-warning for CI
//! - **Profiler integration**: Tracy zones around pump cycles
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                             |
//! |-------|-------------------------------------|
//! | SA1xx | Range allocators and master blocks  |
//! | SA2xx | Upload buffer protocol              |
//! | SA3xx | Device and map failures             |
//! | SA4xx | Teardown                            |
//! | SA9xx | Internal errors                     |
//!
//! Protocol violations (`SA101`-`SA104`, `SA201`-`SA203`, `SA301`) are
//! always fatal. Warnings go to stderr in debug builds, or to the `log`
//! crate with the `log` feature.

pub mod emit;
pub mod kind;
pub mod macros;
pub mod strict;
pub(crate) mod tracy;

pub use emit::{emit, emit_with_context, set_sink, suppress_diagnostics, CollectingSink, DiagnosticSink};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};

pub use kind::{SA101, SA102, SA103, SA104, SA201, SA202, SA203, SA301, SA302, SA303, SA401, SA901};
