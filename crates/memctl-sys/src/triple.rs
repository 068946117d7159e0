//! Normalized memory usage figures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(total, used, free)` in bytes.
///
/// `used + free == total` is expected of the sources but not checked;
/// figures are passed through as reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTriple {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

impl MemoryTriple {
    pub fn new(total: u64, used: u64, free: u64) -> Self {
        Self { total, used, free }
    }

    /// Whether the source figures add up.
    pub fn is_consistent(&self) -> bool {
        self.used.checked_add(self.free) == Some(self.total)
    }
}

impl From<MemoryTriple> for (u64, u64, u64) {
    fn from(t: MemoryTriple) -> Self {
        (t.total, t.used, t.free)
    }
}

impl fmt::Display for MemoryTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.total, self.used, self.free)
    }
}
