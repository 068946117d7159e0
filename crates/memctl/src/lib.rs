//! memctl: heap and system memory control surface
//!
//! Ties the heap controls from `memctl-heap` and the host memory queries
//! from `memctl-sys` into one facade, [`GcModule`], that exposes them as
//! named operations.
//!
//! ```text
//!  caller ──▶ GcModule::call("sys_mmz") ──▶ MmzQuery ──▶ /proc/media-mem
//!                    │
//!                    ├── collect / mem_free ──▶ Reclaimer
//!                    ├── enable / threshold ──▶ GcState
//!                    └── sys_heap / sys_page ──▶ DeviceQuery ──▶ /dev/canmv_misc
//! ```

mod config;
mod module;
mod value;

pub use config::{ConfigError, ENV_DEVICE, ENV_PROCFS, MemctlConfig};
pub use module::{GcError, GcModule, Operation};
pub use value::Value;

pub use memctl_heap::{BYTES_PER_BLOCK, GcState, HeapInfo, MallocReclaimer, Reclaimer};
pub use memctl_sys::{MemoryPool, MemoryTriple, MmzReading, QueryError};
