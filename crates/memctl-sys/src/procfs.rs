//! Media memory zone (MMZ) query.
//!
//! The pseudo-file starts with a single summary line:
//!
//! ```text
//! total:<int>,used:<int>,remain=<int>
//! ```
//!
//! Only the first [`MMZ_READ_LEN`] bytes are read; that is enough for the
//! summary line and anything past it is ignored. Matching is positional and
//! literal. Fields after the first mismatch keep their zero value and no
//! error is raised; [`MmzReading::is_complete`] tells the two cases apart.

use crate::error::QueryError;
use crate::triple::MemoryTriple;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Media memory pseudo-file
pub const PROCFS_PATH: &str = "/proc/media-mem";

/// Bytes read from the pseudo-file
pub const MMZ_READ_LEN: usize = 230;

/// Read length plus the terminator
const MMZ_BUF_LEN: usize = MMZ_READ_LEN + 1;

const FIELD_COUNT: usize = 3;

/// Fields parsed from the summary line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MmzReading {
    pub total: i32,
    pub used: i32,
    pub remain: i32,
    /// Leading fields that matched, 0..=3
    matched: usize,
}

impl MmzReading {
    /// Parse a NUL-terminated (or plain) summary buffer.
    pub fn parse(buf: &[u8]) -> Self {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let mut scan = Scanner::new(&buf[..end]);
        let mut reading = Self::default();

        let fields: [(&[u8], &mut i32); FIELD_COUNT] = [
            (&b"total:"[..], &mut reading.total),
            (&b",used:"[..], &mut reading.used),
            (&b",remain="[..], &mut reading.remain),
        ];
        let mut matched = 0;
        for (literal, slot) in fields {
            if !scan.literal(literal) {
                break;
            }
            match scan.int() {
                Some(value) => *slot = value,
                None => break,
            }
            matched += 1;
        }

        reading.matched = matched;
        reading
    }

    pub fn fields_matched(&self) -> usize {
        self.matched
    }

    /// All three fields were present.
    pub fn is_complete(&self) -> bool {
        self.matched == FIELD_COUNT
    }

    /// Map to `(total, used, free)`. Negative figures read as zero.
    pub fn to_triple(&self) -> MemoryTriple {
        let bytes = |v: i32| u64::try_from(v).unwrap_or(0);
        MemoryTriple {
            total: bytes(self.total),
            used: bytes(self.used),
            free: bytes(self.remain),
        }
    }
}

/// Cursor over the summary line with `scanf`-style primitives.
struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Consume `expected` exactly.
    fn literal(&mut self, expected: &[u8]) -> bool {
        if self.input[self.pos..].starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    /// Consume a decimal integer the way `%d` does: leading C whitespace,
    /// optional sign, at least one digit. Out-of-range values saturate.
    fn int(&mut self) -> Option<i32> {
        let mut pos = self.pos;
        while self.input.get(pos).is_some_and(|&b| is_c_space(b)) {
            pos += 1;
        }

        let negative = match self.input.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };

        let digits_start = pos;
        let mut value: i64 = 0;
        while let Some(&b) = self.input.get(pos) {
            if !b.is_ascii_digit() {
                break;
            }
            value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
            pos += 1;
        }
        if pos == digits_start {
            return None;
        }

        self.pos = pos;
        let value = if negative { -value } else { value };
        Some(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

/// C `isspace` in the "C" locale, which includes vertical tab.
fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0B' | b'\x0C' | b'\r')
}

/// Query against the media memory pseudo-file.
#[derive(Debug, Clone)]
pub struct MmzQuery {
    path: PathBuf,
}

impl Default for MmzQuery {
    fn default() -> Self {
        Self::new(PROCFS_PATH)
    }
}

impl MmzQuery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the summary line.
    ///
    /// Only a failed open is an error. A failed read leaves the buffer empty
    /// and yields an unmatched reading.
    pub fn read(&self) -> Result<MmzReading, QueryError> {
        let mut file = File::open(&self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to open media memory file");
            QueryError::unavailable(&self.path, e)
        })?;

        let mut buf = [0u8; MMZ_BUF_LEN];
        match read_bounded(&mut file, &mut buf[..MMZ_READ_LEN]) {
            Ok(n) => debug!(bytes = n, "Read media memory summary"),
            Err(e) => warn!(error = %e, "Failed to read media memory file"),
        }
        drop(file);
        buf[MMZ_READ_LEN] = 0;

        Ok(MmzReading::parse(&buf))
    }

    /// Read the summary as `(total, used, free)`.
    pub fn query(&self) -> Result<MemoryTriple, QueryError> {
        let reading = self.read()?;
        if !reading.is_complete() {
            warn!(
                matched = reading.fields_matched(),
                "Media memory summary only partially matched"
            );
        }
        Ok(reading.to_triple())
    }
}

/// Fill `buf` until it is full or the file is exhausted.
fn read_bounded(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
