//! Streaming wordlist loader
//!
//! Reads the input line by line, decodes each line with the configured
//! encoding and groups the surviving candidates into bounded batches.
//! Lines that fail to decode are dropped and counted, never fatal.

use crate::error::{RefineryError, Result};
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read buffer for the input file (1MB)
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Upper bound on the capacity reserved up front for a batch
const MAX_BATCH_PREALLOC: usize = 16 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Resolve an encoding label (`utf-8`, `latin1`, `windows-1251`, ...)
///
/// Only ASCII-compatible encodings are accepted since lines are split on
/// the raw `\n` byte.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) if encoding.is_ascii_compatible() => Ok(encoding),
        _ => Err(RefineryError::UnsupportedEncoding(label.to_string())),
    }
}

/// One undecoded input line, without its line terminator
#[derive(Debug, Clone, Copy)]
pub struct RawLine<'a> {
    pub bytes: &'a [u8],
    /// Byte offset of the line start in the source
    pub offset: u64,
}

impl<'a> RawLine<'a> {
    /// Build from a line as returned by `read_until`, dropping `\n` / `\r\n`
    fn from_terminated(bytes: &'a [u8], offset: u64) -> Self {
        let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        Self { bytes, offset }
    }

    fn is_blank(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_whitespace)
    }

    /// Strict decode; `None` if the bytes are not valid in `encoding`
    fn decode(&self, encoding: &'static Encoding) -> Option<Cow<'a, str>> {
        if encoding == encoding_rs::UTF_8 {
            std::str::from_utf8(self.bytes).ok().map(Cow::Borrowed)
        } else {
            encoding.decode_without_bom_handling_and_without_replacement(self.bytes)
        }
    }
}

/// A decoded, trimmed, non-empty password line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PasswordCandidate(String);

impl PasswordCandidate {
    /// Returns `None` for empty text
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for PasswordCandidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PasswordCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered group of at most `chunk_size` candidates
#[derive(Debug, Default, Clone)]
pub struct Batch {
    pub candidates: Vec<PasswordCandidate>,
    /// Lines within this batch's span that failed to decode
    pub skipped: u64,
}

impl Batch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(capacity),
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Lazy sequence of [`Batch`]es over a line-oriented source
///
/// The sequence is finite and can only be restarted by opening the source
/// again.
pub struct ChunkLoader<R> {
    reader: R,
    encoding: &'static Encoding,
    chunk_size: usize,
    line_buf: Vec<u8>,
    offset: u64,
    finished: bool,
}

impl ChunkLoader<BufReader<File>> {
    /// Open a wordlist file
    ///
    /// The chunk size is validated before the file is touched.
    pub fn open(path: &Path, chunk_size: usize, encoding: &'static Encoding) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RefineryError::InvalidChunkSize);
        }

        let file = File::open(path).map_err(|source| RefineryError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_reader(
            BufReader::with_capacity(READ_BUFFER_SIZE, file),
            chunk_size,
            encoding,
        )
    }
}

impl<R: BufRead> ChunkLoader<R> {
    pub fn from_reader(reader: R, chunk_size: usize, encoding: &'static Encoding) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RefineryError::InvalidChunkSize);
        }

        Ok(Self {
            reader,
            encoding,
            chunk_size,
            line_buf: Vec::with_capacity(256),
            offset: 0,
            finished: false,
        })
    }

    /// Bytes read from the source so far
    pub fn bytes_consumed(&self) -> u64 {
        self.offset
    }

    /// Read the next line into `line_buf`, returning its start offset
    fn read_line(&mut self) -> Result<Option<u64>> {
        self.line_buf.clear();
        let start = self.offset;

        let n = self
            .reader
            .read_until(b'\n', &mut self.line_buf)
            .map_err(|source| RefineryError::Read {
                offset: start,
                source,
            })?;

        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;

        if start == 0 && self.encoding == encoding_rs::UTF_8 && self.line_buf.starts_with(UTF8_BOM) {
            self.line_buf.drain(..UTF8_BOM.len());
        }

        Ok(Some(start))
    }
}

impl<R: BufRead> Iterator for ChunkLoader<R> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut batch = Batch::with_capacity(self.chunk_size.min(MAX_BATCH_PREALLOC));

        while batch.len() < self.chunk_size {
            let start = match self.read_line() {
                Ok(Some(start)) => start,
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            let raw = RawLine::from_terminated(&self.line_buf, start);
            if raw.is_blank() {
                continue;
            }

            match raw.decode(self.encoding) {
                Some(text) => {
                    if let Some(candidate) = PasswordCandidate::new(text.trim()) {
                        batch.candidates.push(candidate);
                    }
                }
                None => {
                    log::debug!("Skipping undecodable line at byte {}", raw.offset);
                    batch.skipped += 1;
                }
            }
        }

        if batch.is_empty() && batch.skipped == 0 {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
