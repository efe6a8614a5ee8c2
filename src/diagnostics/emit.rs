//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, the `log` crate, and an
//! optional installed sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::kind::Diagnostic;
use super::strict::strict_mode;
use crate::sync::mutex::Mutex;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Installed sink, if any.
static SINK: RwLock<Option<Arc<dyn DiagnosticSink>>> = RwLock::new(None);

/// Suppress all stderr/log diagnostic output. Sinks still receive them.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Install a sink that receives every emitted diagnostic.
///
/// Returns the previously installed sink.
pub fn set_sink(sink: Option<Arc<dyn DiagnosticSink>>) -> Option<Arc<dyn DiagnosticSink>> {
    let mut slot = SINK.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *slot, sink)
}

/// Emit a diagnostic.
///
/// Errors and warnings escalate to a panic according to the strict mode.
pub fn emit(diag: &Diagnostic) {
    emit_with_context(diag, "");
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    deliver(diag, context);

    if strict_mode().escalates(diag.kind) {
        panic!(
            "[stagealloc][{}] {}{}\nStrict mode enabled - diagnostics are fatal.",
            diag.code,
            diag.message,
            context_suffix(context)
        );
    }
}

/// Emit an error diagnostic and abort the current thread.
///
/// Used for protocol violations: continuing would risk the GPU reading or
/// writing memory that the CPU side already handed to someone else.
#[cold]
pub fn fatal(diag: &Diagnostic, context: &str) -> ! {
    deliver(diag, context);
    panic!("[stagealloc][{}] {}{}", diag.code, diag.message, context_suffix(context));
}

fn context_suffix(context: &str) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" ({})", context)
    }
}

fn deliver(diag: &Diagnostic, context: &str) {
    let sink = SINK.read().unwrap_or_else(PoisonError::into_inner).clone();
    if let Some(sink) = sink {
        sink.emit(diag, context);
    }

    if is_suppressed() {
        return;
    }

    #[cfg(feature = "log")]
    emit_to_log(diag, context);

    #[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
    emit_to_stderr(diag, context);
}

/// Internal: emit to stderr.
#[cfg(all(not(feature = "log"), any(debug_assertions, feature = "diagnostics")))]
fn emit_to_stderr(diag: &Diagnostic, context: &str) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(
        stderr,
        "[stagealloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );
    if !context.is_empty() {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
    let _ = writeln!(stderr);
}

/// Internal: emit through the log crate.
#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: &str) {
    use super::kind::DiagnosticKind;

    let suffix = context_suffix(context);
    match diag.kind {
        DiagnosticKind::Error => log::error!("[{}] {}{}", diag.code, diag.message, suffix),
        DiagnosticKind::Warning => log::warn!("[{}] {}{}", diag.code, diag.message, suffix),
        DiagnosticKind::Note => log::info!("[{}] {}{}", diag.code, diag.message, suffix),
    }
    if let Some(note) = diag.note {
        log::debug!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::debug!("  help: {}", help);
    }
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic, context: &str);
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<(Diagnostic, String)>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected diagnostics with their context.
    pub fn diagnostics(&self) -> Vec<(Diagnostic, String)> {
        self.diagnostics.lock().clone()
    }

    /// Check whether a diagnostic with the given code was collected.
    pub fn contains(&self, code: &str) -> bool {
        self.diagnostics.lock().iter().any(|(d, _)| d.code == code)
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic, context: &str) {
        self.diagnostics.lock().push((diag.clone(), context.to_string()));
    }
}
