//! Collector control state
//!
//! The automatic-collection switch and the allocation threshold are the
//! only mutable state the control surface owns. Both live in [`GcState`],
//! which the caller owns and lends to the reclaimer when it needs to decide
//! whether an automatic collection is due.
//!
//! The threshold is stored in allocator blocks and exposed in bytes:
//!
//! ```text
//!   set_threshold(bytes) ──▶ bytes / BYTES_PER_BLOCK ──▶ alloc_threshold
//!   threshold()          ◀── blocks * BYTES_PER_BLOCK ◀── alloc_threshold
//! ```

use serde::Serialize;
use tracing::info;

/// Size of one allocator block in bytes (four machine words)
pub const BYTES_PER_BLOCK: usize = 4 * std::mem::size_of::<usize>();

/// Threshold value meaning "never trigger automatically"
pub const THRESHOLD_DISABLED: usize = usize::MAX;

/// Process-wide collector configuration.
///
/// Not synchronized: callers serialize access, the way a single-threaded
/// interpreter host does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcState {
    /// Whether the reclaimer may collect on its own
    auto_collect_enabled: bool,
    /// Allocation threshold in blocks, or [`THRESHOLD_DISABLED`]
    alloc_threshold: usize,
}

impl Default for GcState {
    fn default() -> Self {
        Self::new()
    }
}

impl GcState {
    /// Fresh state as set up at process start: enabled, no threshold.
    pub fn new() -> Self {
        Self {
            auto_collect_enabled: true,
            alloc_threshold: THRESHOLD_DISABLED,
        }
    }

    /// Allow automatic collections.
    pub fn enable(&mut self) {
        self.auto_collect_enabled = true;
        info!("Automatic collection enabled");
    }

    /// Suppress automatic collections. Explicit collections still run.
    pub fn disable(&mut self) {
        self.auto_collect_enabled = false;
        info!("Automatic collection disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.auto_collect_enabled
    }

    /// Raw threshold in blocks.
    pub fn alloc_threshold_blocks(&self) -> usize {
        self.alloc_threshold
    }

    /// Decide whether an automatic collection is due after
    /// `allocated_blocks` blocks were handed out since the last one.
    pub fn should_auto_collect(&self, allocated_blocks: usize) -> bool {
        self.auto_collect_enabled
            && self.alloc_threshold != THRESHOLD_DISABLED
            && allocated_blocks >= self.alloc_threshold
    }

    /// Current threshold in bytes, `-1` when disabled.
    #[cfg(feature = "alloc-threshold")]
    pub fn threshold(&self) -> i64 {
        if self.alloc_threshold == THRESHOLD_DISABLED {
            return -1;
        }
        (self.alloc_threshold as i64).saturating_mul(BYTES_PER_BLOCK as i64)
    }

    /// Set the threshold in bytes. Negative values disable it; others are
    /// truncated down to whole blocks.
    #[cfg(feature = "alloc-threshold")]
    pub fn set_threshold(&mut self, bytes: i64) {
        self.alloc_threshold = if bytes < 0 {
            THRESHOLD_DISABLED
        } else {
            (bytes as u64 / BYTES_PER_BLOCK as u64) as usize
        };
        tracing::debug!(
            bytes,
            blocks = self.alloc_threshold,
            "Allocation threshold updated"
        );
    }
}
