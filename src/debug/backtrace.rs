//! Master block allocation backtraces.
//!
//! Records where each outstanding master block was allocated so a pool torn
//! down with leaked blocks can say who leaked them.

use std::collections::HashMap;

use crate::allocators::range::Range;
use crate::sync::mutex::Mutex;

/// A captured backtrace for an outstanding master block.
#[derive(Clone)]
pub struct BlockTrace {
    /// The leaked range.
    pub range: Range,

    /// Captured backtrace (as string for simplicity)
    pub backtrace: String,
}

/// Tracks backtraces of outstanding blocks, keyed by offset.
#[derive(Default)]
pub struct BlockTraceTracker {
    traces: Mutex<HashMap<u64, BlockTrace>>,
}

impl BlockTraceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the allocation site of a block.
    pub fn record(&self, range: Range) {
        let trace = BlockTrace {
            range,
            backtrace: format!("{:?}", backtrace::Backtrace::new()),
        };
        self.traces.lock().insert(range.offset, trace);
    }

    /// Forget a block that was returned.
    pub fn remove(&self, range: Range) {
        self.traces.lock().remove(&range.offset);
    }

    /// Number of blocks currently tracked.
    pub fn len(&self) -> usize {
        self.traces.lock().len()
    }

    /// Whether no blocks are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Format a report of every outstanding block, lowest offset first.
    pub fn report(&self) -> String {
        let traces = self.traces.lock();
        let mut leaked: Vec<&BlockTrace> = traces.values().collect();
        leaked.sort_by_key(|t| t.range.offset);

        let mut out = format!("{} leaked master block(s):\n", leaked.len());
        for trace in leaked {
            out.push_str(&format!(
                "  [{}..{}) allocated at:\n{}\n",
                trace.range.offset,
                trace.range.end(),
                trace.backtrace
            ));
        }
        out
    }
}
