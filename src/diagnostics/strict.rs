//! Strict mode: which diagnostics escalate to a panic.
//!
//! Protocol violations abort regardless. Strict mode only governs the
//! diagnostics that are otherwise survivable, so CI can fail on a leaked
//! upload operation or a map that keeps hitting a busy GPU.

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use super::kind::DiagnosticKind;

/// Escalation policy for emitted diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictMode {
    /// Report only.
    #[default]
    Warn,
    /// Panic on errors.
    PanicOnError,
    /// Panic on errors and warnings.
    PanicOnWarning,
}

impl StrictMode {
    /// Whether a diagnostic of `kind` panics under this mode.
    pub fn escalates(self, kind: DiagnosticKind) -> bool {
        match kind {
            DiagnosticKind::Error => self != StrictMode::Warn,
            DiagnosticKind::Warning => self == StrictMode::PanicOnWarning,
            DiagnosticKind::Note => false,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            StrictMode::Warn => 0,
            StrictMode::PanicOnError => 1,
            StrictMode::PanicOnWarning => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => StrictMode::PanicOnError,
            2 => StrictMode::PanicOnWarning,
            _ => StrictMode::Warn,
        }
    }
}

impl FromStr for StrictMode {
    type Err = String;

    /// Accepts `0`/`warn`, `1`/`error`, `2`/`warning`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "warn" | "off" => Ok(StrictMode::Warn),
            "1" | "error" | "errors" => Ok(StrictMode::PanicOnError),
            "2" | "warning" | "warnings" | "all" => Ok(StrictMode::PanicOnWarning),
            other => Err(format!("unknown strict mode '{}'", other)),
        }
    }
}

static MODE: AtomicU8 = AtomicU8::new(0);

/// Set the process-wide strict mode.
pub fn set_strict_mode(mode: StrictMode) {
    MODE.store(mode.to_bits(), Ordering::Relaxed);
}

/// Current process-wide strict mode.
pub fn strict_mode() -> StrictMode {
    StrictMode::from_bits(MODE.load(Ordering::Relaxed))
}

/// Restores the previous strict mode when dropped.
#[must_use = "the previous mode is restored as soon as the guard is dropped"]
pub struct StrictModeGuard {
    previous: StrictMode,
}

impl StrictModeGuard {
    /// Switch to `mode` until the guard goes out of scope.
    pub fn new(mode: StrictMode) -> Self {
        let previous = strict_mode();
        set_strict_mode(mode);
        Self { previous }
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        set_strict_mode(self.previous);
    }
}

/// Read `STAGEALLOC_STRICT` and apply it. Unset or unparsable leaves the
/// mode unchanged.
pub fn init_from_env() {
    if let Some(mode) = std::env::var("STAGEALLOC_STRICT")
        .ok()
        .and_then(|value| value.parse().ok())
    {
        set_strict_mode(mode);
    }
}
