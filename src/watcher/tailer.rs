//! Incremental line tailer.
//!
//! Reads bytes appended to a log file since a known offset and splits them
//! into complete lines. A trailing line without its terminator is held back
//! and excluded from the offset, since the game server may still be writing it.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::category::LogEncoding;
use crate::state::effective_offset;

use super::error::WatcherError;

/// One complete line read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailedLine {
    /// Decoded text without the line terminator.
    pub text: String,
    /// Byte offset of the first byte of the line.
    pub start: u64,
    /// Byte offset just past the terminating newline.
    pub end: u64,
}

/// Result of one tail pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailBatch {
    pub lines: Vec<TailedLine>,
    /// Offset after the last emitted line.
    pub new_offset: u64,
    /// The file was smaller than the requested offset and was re-read from 0.
    pub truncated: bool,
}

/// Read complete lines appended to `path` after `from_offset`.
///
/// If the file is now smaller than `from_offset` it was truncated or
/// replaced, and reading restarts at 0.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read. Callers keep
/// their previous offset in that case and retry on the next trigger.
pub async fn tail(
    path: &Path,
    from_offset: u64,
    encoding: LogEncoding,
) -> Result<TailBatch, WatcherError> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatcherError::FileDeleted(path.to_path_buf()));
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(WatcherError::PermissionDenied(path.to_path_buf()));
        }
        Err(e) => return Err(WatcherError::Io(e)),
    };

    let file_len = file.metadata().await?.len();
    let start = effective_offset(from_offset, file_len);
    let truncated = start != from_offset;
    if truncated {
        tracing::warn!(
            path = %path.display(),
            old_offset = from_offset,
            new_len = file_len,
            "File truncated, resetting offset to 0"
        );
    }

    if file_len <= start {
        return Ok(TailBatch {
            lines: Vec::new(),
            new_offset: start,
            truncated,
        });
    }

    file.seek(std::io::SeekFrom::Start(start)).await?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;

    let (lines, new_offset) = split_lines(&buf, start, encoding);
    Ok(TailBatch {
        lines,
        new_offset,
        truncated,
    })
}

/// Split a buffer read at `base` into complete lines.
///
/// Returns the lines and the offset just past the last complete line.
#[must_use]
pub fn split_lines(buf: &[u8], base: u64, encoding: LogEncoding) -> (Vec<TailedLine>, u64) {
    let unit = encoding.unit_len();
    let mut lines = Vec::new();
    let mut line_start = 0usize;

    let mut content_from = 0usize;
    if base == 0 && buf.starts_with(encoding.bom()) {
        content_from = encoding.bom().len();
    }

    let mut i = 0usize;
    while i + unit <= buf.len() {
        if is_newline(&buf[i..i + unit], encoding) {
            let text_start = line_start.max(content_from);
            let text = decode(&buf[text_start..i], encoding);
            let end = i + unit;
            lines.push(TailedLine {
                text: text.trim_end_matches('\r').to_string(),
                start: base + line_start as u64,
                end: base + end as u64,
            });
            line_start = end;
        }
        i += unit;
    }

    (lines, base + line_start as u64)
}

fn is_newline(unit: &[u8], encoding: LogEncoding) -> bool {
    match encoding {
        LogEncoding::Utf8 => unit[0] == b'\n',
        LogEncoding::Utf16Le => unit == [b'\n', 0],
    }
}

fn decode(bytes: &[u8], encoding: LogEncoding) -> String {
    match encoding {
        LogEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        LogEncoding::Utf16Le => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}

/// Tailer that remembers its own position in one file.
#[derive(Debug)]
pub struct LineTailer {
    path: PathBuf,
    offset: u64,
    encoding: LogEncoding,
}

impl LineTailer {
    /// Create a new tailer starting at offset 0.
    #[must_use]
    pub fn new(path: PathBuf, encoding: LogEncoding) -> Self {
        Self::with_offset(path, encoding, 0)
    }

    /// Create a new tailer starting at a specific offset.
    #[must_use]
    pub fn with_offset(path: PathBuf, encoding: LogEncoding, offset: u64) -> Self {
        Self {
            path,
            offset,
            encoding,
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read complete lines appended since the last read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read; the offset is unchanged.
    pub async fn read_new_lines(&mut self) -> Result<Vec<TailedLine>, WatcherError> {
        let batch = tail(&self.path, self.offset, self.encoding).await?;
        self.offset = batch.new_offset;
        Ok(batch.lines)
    }

    /// Reset the offset to the beginning of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}
