//! memctl system memory queries
//!
//! Reads memory-pool figures from two host sources and normalizes both into
//! a [`MemoryTriple`]:
//!
//! - the misc device, via `ioctl` control codes (heap and page pools)
//! - the media-memory pseudo-file, via a fixed `key:value` text line (MMZ)
//!
//! Every descriptor is opened, used and closed within a single call.

mod device;
mod error;
mod procfs;
mod triple;

pub use device::{DEVICE_PATH, DeviceQuery, DeviceRecord, MemoryPool};
pub use error::QueryError;
pub use procfs::{MMZ_READ_LEN, MmzQuery, MmzReading, PROCFS_PATH};
pub use triple::MemoryTriple;
