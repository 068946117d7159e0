//! Query errors.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the system memory queries
#[derive(Debug, Error)]
pub enum QueryError {
    /// The device or pseudo-file could not be opened
    #[error("{}: resource unavailable (os error {code})", .path.display())]
    ResourceUnavailable { path: PathBuf, code: i32 },

    /// The driver rejected the control request
    #[error("control request {request:#x} failed (os error {code})")]
    ControlRequest { request: u32, code: i32 },
}

impl QueryError {
    pub(crate) fn unavailable(path: &Path, err: io::Error) -> Self {
        Self::ResourceUnavailable {
            path: path.to_path_buf(),
            code: os_code(&err),
        }
    }

    /// Platform error number carried by this error
    pub fn code(&self) -> i32 {
        match self {
            Self::ResourceUnavailable { code, .. } | Self::ControlRequest { code, .. } => *code,
        }
    }
}

pub(crate) fn os_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(libc::EIO)
}
