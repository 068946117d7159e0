//! Misc device memory query.
//!
//! The driver fills a three-word record in response to one of two control
//! codes. Its field order is `(total, free, used)`, which differs from the
//! `(total, used, free)` order callers get back.

use crate::error::{QueryError, os_code};
use crate::triple::MemoryTriple;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Misc device exposing system heap and page statistics
pub const DEVICE_PATH: &str = "/dev/canmv_misc";

const CMD_READ_HEAP: u32 = 0x1024;
const CMD_READ_PAGE: u32 = 0x1024 + 1;

/// Pool the driver reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPool {
    /// System heap
    Heap,
    /// Page allocator
    Page,
}

impl MemoryPool {
    /// Control code selecting this pool
    pub const fn request(self) -> u32 {
        match self {
            Self::Heap => CMD_READ_HEAP,
            Self::Page => CMD_READ_PAGE,
        }
    }
}

/// Record layout written by the driver
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    pub total_size: usize,
    pub free_size: usize,
    pub used_size: usize,
}

impl From<DeviceRecord> for MemoryTriple {
    fn from(record: DeviceRecord) -> Self {
        MemoryTriple {
            total: record.total_size as u64,
            used: record.used_size as u64,
            free: record.free_size as u64,
        }
    }
}

/// Query against a misc device node.
#[derive(Debug, Clone)]
pub struct DeviceQuery {
    path: PathBuf,
}

impl Default for DeviceQuery {
    fn default() -> Self {
        Self::new(DEVICE_PATH)
    }
}

impl DeviceQuery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the figures for `pool`.
    ///
    /// The device is opened read-only and closed before returning on every
    /// path, including a failed control request. A rejected request is
    /// reported as [`QueryError::ControlRequest`] rather than as a zeroed
    /// triple.
    pub fn query(&self, pool: MemoryPool) -> Result<MemoryTriple, QueryError> {
        let device = File::open(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to open memory device");
            QueryError::unavailable(&self.path, e)
        })?;

        let record = read_record(&device, pool).map_err(|e| {
            warn!(?pool, error = %e, "Memory device rejected control request");
            QueryError::ControlRequest {
                request: pool.request(),
                code: os_code(&e),
            }
        })?;

        debug!(
            ?pool,
            total = record.total_size,
            used = record.used_size,
            free = record.free_size,
            "Read device memory record"
        );
        Ok(record.into())
    }
}

fn read_record(device: &File, pool: MemoryPool) -> io::Result<DeviceRecord> {
    let mut record = DeviceRecord::default();
    let rc = unsafe {
        libc::ioctl(
            device.as_raw_fd(),
            pool.request() as _,
            &mut record as *mut DeviceRecord,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(record)
}
