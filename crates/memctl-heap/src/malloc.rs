//! Host C allocator as a reclaimer.
//!
//! Uses glibc's `mallinfo2()` for counters and `malloc_trim()` to hand free
//! pages back to the kernel. On other targets the counters read as zero and
//! collection is a no-op.

use crate::reclaimer::Reclaimer;
use crate::state::{BYTES_PER_BLOCK, GcState};
use crate::stats::HeapInfo;
use tracing::debug;

/// Reclaimer backed by the process' C heap
#[derive(Debug, Default)]
pub struct MallocReclaimer;

impl MallocReclaimer {
    pub fn new() -> Self {
        Self
    }
}

impl Reclaimer for MallocReclaimer {
    fn collect(&mut self, state: &GcState) -> usize {
        let before = self.info().free;
        let released = trim();
        let after = self.info().free;

        let blocks = before.saturating_sub(after) / BYTES_PER_BLOCK;
        debug!(
            released,
            blocks,
            auto_enabled = state.is_enabled(),
            "malloc_trim complete"
        );
        blocks
    }

    fn info(&self) -> HeapInfo {
        read_mallinfo()
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn read_mallinfo() -> HeapInfo {
    let info = unsafe { libc::mallinfo2() };
    HeapInfo {
        free: info.fordblks,
        used: info.uordblks,
        max_growable: None,
    }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn read_mallinfo() -> HeapInfo {
    HeapInfo::default()
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn trim() -> bool {
    unsafe { libc::malloc_trim(0) == 1 }
}

#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
fn trim() -> bool {
    false
}
