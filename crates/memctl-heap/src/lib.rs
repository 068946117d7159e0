//! memctl heap control
//!
//! Drives an opaque memory reclaimer: explicit collection, the automatic
//! collection switch, the byte-granularity allocation threshold, and heap
//! occupancy figures.
//!
//! # Compile-time options
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `alloc-threshold` | threshold get/set on [`GcState`] |
//! | `split-heap-auto` | `mem_free` includes growth headroom |
//! | `collect-retval` | collection reports reclaimed block count |

mod malloc;
mod reclaimer;
mod state;
mod stats;

pub use malloc::MallocReclaimer;
pub use reclaimer::Reclaimer;
pub use state::{BYTES_PER_BLOCK, GcState, THRESHOLD_DISABLED};
pub use stats::{HeapInfo, mem_alloc, mem_free};
