//! Diagnostic kinds and predefined codes.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A protocol violation or hardware failure.
    Error,
    /// Suspicious but survivable state.
    Warning,
    /// Additional context about another diagnostic.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `SA1xx` - Range allocators and master blocks
/// - `SA2xx` - Upload buffer protocol
/// - `SA3xx` - Device and map failures
/// - `SA4xx` - Teardown
/// - `SA9xx` - Internal errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "SA101").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// SA1xx - Range allocators and master blocks
// =============================================================================

/// SA101: Range freed twice or freed outside the arena.
pub const SA101: Diagnostic = Diagnostic::error(
    "SA101",
    "range freed twice or outside the arena"
).with_note("the freed range overlaps memory the allocator already considers free")
 .with_help("each Range returned by allocate() must be freed exactly once");

/// SA102: Master block released to a pool it did not come from.
pub const SA102: Diagnostic = Diagnostic::error(
    "SA102",
    "master block released to a foreign pool"
).with_note("the block's pool identity does not match the releasing pool")
 .with_help("release master blocks through the pool that allocated them");

/// SA103: Allocator or pool destroyed with live allocations.
pub const SA103: Diagnostic = Diagnostic::error(
    "SA103",
    "allocator destroyed with live allocations"
).with_note("some ranges or master blocks were never returned")
 .with_help("release all master blocks and purge the device before dropping the pool");

/// SA104: Dynamic heap dropped while still owning master blocks.
pub const SA104: Diagnostic = Diagnostic::error(
    "SA104",
    "dynamic heap dropped with unreleased master blocks"
).with_help("call release_master_blocks() or discard_master_blocks() at frame end");

// =============================================================================
// SA2xx - Upload protocol
// =============================================================================

/// SA201: Upload buffer recycled before its copy was scheduled.
pub const SA201: Diagnostic = Diagnostic::error(
    "SA201",
    "upload buffer recycled before its copy was scheduled"
).with_note("the GPU copy out of this staging texture has not been submitted yet")
 .with_help("call schedule_gpu_copy() and wait_for_copy_scheduled() before recycle()");

/// SA202: Copy processed for a buffer that is not mapped.
pub const SA202: Diagnostic = Diagnostic::error(
    "SA202",
    "upload buffer copied before it was mapped"
).with_note("a Copy operation reached the pump before the buffer's Map completed")
 .with_help("only schedule copies for buffers returned by acquire()");

/// SA203: Second pending operation of the same kind for one buffer.
pub const SA203: Diagnostic = Diagnostic::error(
    "SA203",
    "duplicate pending operation for upload buffer"
).with_note("a buffer may have at most one outstanding operation of each kind")
 .with_help("wait for the previous operation to complete before enqueueing another");

// =============================================================================
// SA3xx - Device
// =============================================================================

/// SA301: Hard failure while mapping a staging subresource.
pub const SA301: Diagnostic = Diagnostic::error(
    "SA301",
    "unrecoverable error while mapping staging texture"
).with_note("this is distinct from WouldBlock, which is retried")
 .with_help("check the device for loss or invalid staging descriptors");

/// SA302: Map operation keeps returning WouldBlock.
pub const SA302: Diagnostic = Diagnostic::warning(
    "SA302",
    "staging texture map retried many times"
).with_note("the GPU is still using this staging texture after many pump cycles")
 .with_help("check that the device advances its completion counter, or raise map_retry_warning_threshold");

/// SA303: Staging texture creation failed.
pub const SA303: Diagnostic = Diagnostic::warning(
    "SA303",
    "failed to create staging texture"
).with_help("the error is returned to the caller of acquire()");

// =============================================================================
// SA4xx - Teardown
// =============================================================================

/// SA401: Upload pool destroyed with pending operations.
pub const SA401: Diagnostic = Diagnostic::warning(
    "SA401",
    "upload pool destroyed with pending operations"
).with_note("threads waiting on these operations may deadlock")
 .with_help("keep pumping render_thread_update() until stats().pending_operations() is zero");

// =============================================================================
// SA9xx - Internal
// =============================================================================

/// SA901: Internal error.
pub const SA901: Diagnostic = Diagnostic::error(
    "SA901",
    "internal allocator error"
).with_note("this indicates a bug in stagealloc");
