//! Heap occupancy reporting.
//!
//! Figures are read fresh from the reclaimer on every call and never
//! cached.

use crate::reclaimer::Reclaimer;
use serde::Serialize;
use std::fmt;

/// Live counters reported by the reclaimer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeapInfo {
    /// Bytes available in the current heap
    pub free: usize,
    /// Bytes currently allocated
    pub used: usize,
    /// Largest region the heap could still grow by, if the host can grow it
    pub max_growable: Option<usize>,
}

impl HeapInfo {
    /// Free bytes as reported to callers.
    ///
    /// With `split-heap-auto`, growth headroom counts as free. This is a
    /// heuristic: the region does not exist until the heap grows into it.
    pub fn reported_free(&self) -> usize {
        if cfg!(feature = "split-heap-auto") {
            self.free_with_headroom()
        } else {
            self.free
        }
    }

    /// `free` plus whatever the heap could still grow by.
    pub fn free_with_headroom(&self) -> usize {
        self.free.saturating_add(self.max_growable.unwrap_or(0))
    }
}

/// Render a byte count with the largest binary unit that keeps it >= 1.
fn human_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut scaled = bytes as f64 / 1024.0;
    let mut unit = 0;
    while scaled >= 1024.0 && unit + 1 < UNITS.len() {
        scaled /= 1024.0;
        unit += 1;
    }
    format!("{scaled:.1} {}", UNITS[unit])
}

impl fmt::Display for HeapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} used, {} free",
            human_bytes(self.used),
            human_bytes(self.reported_free())
        )?;
        if let Some(growable) = self.max_growable {
            write!(f, " (+{} growable)", human_bytes(growable))?;
        }
        Ok(())
    }
}

/// Bytes of heap available, see [`HeapInfo::reported_free`].
pub fn mem_free<R: Reclaimer + ?Sized>(reclaimer: &R) -> usize {
    reclaimer.info().reported_free()
}

/// Bytes of heap currently allocated.
pub fn mem_alloc<R: Reclaimer + ?Sized>(reclaimer: &R) -> usize {
    reclaimer.info().used
}
