//! Output management module
//!
//! Owns the single output sink of a run, picks the serialization format and
//! writes records with buffering. Output goes to a temporary file next to
//! the target that is renamed into place only when the run succeeds.

use crate::analyzer::{AnalyzedBatch, AnalyzedRecord, AnalyzedRecords};
use crate::error::{RefineryError, Result};
use std::borrow::Cow;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default buffer size for output writing (8MB)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Largest metadata row count still rendered as an ASCII table
pub const ASCII_TABLE_MAX_ROWS: usize = 5000;

/// Column names shared by every metadata format
pub const METADATA_COLUMNS: [&str; 7] = [
    "password",
    "entropy",
    "strength",
    "has_upper",
    "has_lower",
    "has_digit",
    "has_special",
];

/// Decimal places for entropy in table formats
const TABLE_ENTROPY_PRECISION: usize = 4;

/// Serialization used when metadata mode is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    AsciiTable,
    Csv,
    Markdown,
}

/// Resolved output format of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    RawText,
    Metadata(MetadataFormat),
}

impl OutputMode {
    /// Apply the format policy for a known final row count
    ///
    /// 1. metadata off → raw text
    /// 2. markdown requested → markdown (requires metadata)
    /// 3. at most [`ASCII_TABLE_MAX_ROWS`] rows → ASCII table
    /// 4. otherwise → CSV
    pub fn decide(metadata: bool, markdown: bool, rows: usize) -> Result<Self> {
        match (metadata, markdown) {
            (false, true) => Err(RefineryError::MarkdownWithoutMetadata),
            (false, false) => Ok(Self::RawText),
            (true, true) => Ok(Self::Metadata(MetadataFormat::Markdown)),
            (true, false) if rows <= ASCII_TABLE_MAX_ROWS => {
                Ok(Self::Metadata(MetadataFormat::AsciiTable))
            }
            (true, false) => Ok(Self::Metadata(MetadataFormat::Csv)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RawText => "text",
            Self::Metadata(MetadataFormat::AsciiTable) => "ascii table",
            Self::Metadata(MetadataFormat::Csv) => "csv",
            Self::Metadata(MetadataFormat::Markdown) => "markdown",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Buffered output file with write-then-rename finalization
///
/// Dropping a sink without calling [`SinkFile::commit`] or
/// [`SinkFile::salvage`] discards everything written to it.
pub struct SinkFile {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
    bytes_written: u64,
}

impl SinkFile {
    /// Create a sink for `target`, creating its directory if needed
    pub fn create(target: PathBuf, buffer_size: usize) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_output_dir(&dir).map_err(|e| RefineryError::sink(&target, e))?;

        let file = NamedTempFile::new_in(&dir).map_err(|e| RefineryError::sink(&target, e))?;

        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            target,
            bytes_written: 0,
        })
    }

    /// Write a line to the output
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line).map_err(|e| RefineryError::sink(&self.target, e))?;
        self.bytes_written += line.len() as u64 + 1;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and move the output onto the target path
    ///
    /// If the flush or the rename fails, whatever reached the temporary file
    /// is kept as `<target>.partial` before the error is returned.
    pub fn commit(self) -> Result<PathBuf> {
        let target = self.target;
        let (file, flush_error) = into_file(self.writer);

        if let Some(e) = flush_error {
            keep_partial(file, &target);
            return Err(RefineryError::sink(&target, e));
        }

        match file.persist(&target) {
            Ok(_) => Ok(target),
            Err(e) => {
                keep_partial(e.file, &target);
                Err(RefineryError::sink(&target, e.error))
            }
        }
    }

    /// Flush what has been written so far and keep it as `<target>.partial`
    pub fn salvage(self) -> Result<PathBuf> {
        let target = self.target;
        let partial = partial_path(&target);

        // Data stuck in the buffer is lost, but what reached disk is kept
        let (file, flush_error) = into_file(self.writer);
        if let Some(e) = flush_error {
            log::warn!("Could not flush output before salvage: {}", e);
        }

        file.persist(&partial)
            .map_err(|e| RefineryError::sink(&target, e.error))?;
        Ok(partial)
    }
}

/// Unwrap the temp file, returning the flush error instead of dropping the file
fn into_file(writer: BufWriter<NamedTempFile>) -> (NamedTempFile, Option<std::io::Error>) {
    match writer.into_inner() {
        Ok(file) => (file, None),
        Err(e) => {
            let (error, writer) = e.into_parts();
            let (file, _unflushed) = writer.into_parts();
            (file, Some(error))
        }
    }
}

fn keep_partial(file: NamedTempFile, target: &Path) {
    let partial = partial_path(target);
    match file.persist(&partial) {
        Ok(_) => log::warn!("Completed output kept at {:?}", partial),
        Err(e) => log::warn!("Could not keep partial output: {}", e.error),
    }
}

/// Path used for output salvaged from a failed run
pub fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Ensure output directory exists
pub fn ensure_output_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Quote a CSV field if it contains a delimiter, quote or line break
pub fn csv_escape(field: &str) -> Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn csv_header() -> String {
    METADATA_COLUMNS.join(",")
}

/// One CSV line; entropy is written at full precision
pub fn csv_row(record: &AnalyzedRecord) -> String {
    let flags = &record.flags;
    format!(
        "{},{},{},{},{},{},{}",
        csv_escape(&record.password),
        record.entropy,
        record.strength,
        flags.has_upper,
        flags.has_lower,
        flags.has_digit,
        flags.has_special,
    )
}

fn table_cells(record: &AnalyzedRecord) -> [String; 7] {
    let flags = &record.flags;
    [
        record.password.clone(),
        format!("{:.*}", TABLE_ENTROPY_PRECISION, record.entropy),
        record.strength.to_string(),
        flags.has_upper.to_string(),
        flags.has_lower.to_string(),
        flags.has_digit.to_string(),
        flags.has_special.to_string(),
    ]
}

/// Header and alignment lines of a GitHub-flavoured markdown table
pub fn markdown_header() -> [String; 2] {
    [
        format!("| {} |", METADATA_COLUMNS.join(" | ")),
        "|---|---:|---|---|---|---|---|".to_string(),
    ]
}

pub fn markdown_row(record: &AnalyzedRecord) -> String {
    let mut cells = table_cells(record);
    cells[0] = cells[0].replace('|', "\\|");
    format!("| {} |", cells.join(" | "))
}

/// Render a bordered fixed-width table sized to its widest values
///
/// Values are never truncated.
pub fn render_ascii_table(records: &[AnalyzedRecord]) -> Vec<String> {
    let rows: Vec<[String; 7]> = records.iter().map(table_cells).collect();

    let mut widths = METADATA_COLUMNS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let border = widths.iter().fold(String::from("+"), |mut line, w| {
        line.push_str(&"-".repeat(w + 2));
        line.push('+');
        line
    });

    let format_row = |cells: &[&str]| {
        let mut line = String::from("|");
        for (col, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
            let pad = width - cell.chars().count();
            // entropy column is right-aligned
            if col == 1 {
                line.push_str(&format!(" {}{} |", " ".repeat(pad), cell));
            } else {
                line.push_str(&format!(" {}{} |", cell, " ".repeat(pad)));
            }
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 4);
    lines.push(border.clone());
    lines.push(format_row(&METADATA_COLUMNS));
    lines.push(border.clone());
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(format_row(&cells));
    }
    lines.push(border);
    lines
}

/// Where the writer currently sends records
enum Stage {
    Text,
    Csv,
    Markdown,
    /// Metadata rows held back while the ASCII table / CSV choice is open
    Pending(Vec<AnalyzedRecord>),
}

/// Summary of a finalized output
#[derive(Debug, Clone)]
pub struct WriteSummary {
    pub mode: OutputMode,
    pub path: PathBuf,
    pub records: u64,
    pub bytes: u64,
}

/// Record writer for one run
///
/// Text, CSV and markdown output are streamed batch by batch. Without
/// markdown, metadata rows are buffered until either the stream ends (the
/// buffer becomes an ASCII table) or the buffer would exceed
/// [`ASCII_TABLE_MAX_ROWS`] (the buffer is flushed as CSV and the rest of the
/// stream follows as CSV). At most `ASCII_TABLE_MAX_ROWS + 1` rows are ever
/// held in memory.
pub struct RecordWriter {
    sink: SinkFile,
    stage: Stage,
    records: u64,
}

impl RecordWriter {
    /// Validate the mode flags and open the sink
    pub fn create(target: PathBuf, metadata: bool, markdown: bool, buffer_size: usize) -> Result<Self> {
        // Row count is irrelevant here, only the flag combination
        let requested = OutputMode::decide(metadata, markdown, 0)?;
        let mut sink = SinkFile::create(target, buffer_size)?;

        let stage = match requested {
            OutputMode::RawText => Stage::Text,
            OutputMode::Metadata(MetadataFormat::Markdown) => {
                for line in markdown_header() {
                    sink.write_line(&line)?;
                }
                Stage::Markdown
            }
            OutputMode::Metadata(_) => Stage::Pending(Vec::new()),
        };

        Ok(Self {
            sink,
            stage,
            records: 0,
        })
    }

    /// Format decided so far, `None` while still buffering
    pub fn mode(&self) -> Option<OutputMode> {
        match self.stage {
            Stage::Text => Some(OutputMode::RawText),
            Stage::Csv => Some(OutputMode::Metadata(MetadataFormat::Csv)),
            Stage::Markdown => Some(OutputMode::Metadata(MetadataFormat::Markdown)),
            Stage::Pending(_) => None,
        }
    }

    pub fn write_batch(&mut self, batch: AnalyzedBatch) -> Result<()> {
        let count = batch.len() as u64;

        match &mut self.stage {
            Stage::Text => {
                for password in batch.passwords() {
                    self.sink.write_line(password)?;
                }
            }
            Stage::Csv => {
                for record in into_scored(batch, "csv")? {
                    self.sink.write_line(&csv_row(&record))?;
                }
            }
            Stage::Markdown => {
                for record in into_scored(batch, "markdown")? {
                    self.sink.write_line(&markdown_row(&record))?;
                }
            }
            Stage::Pending(buffered) => {
                let records = into_scored(batch, "table")?;

                if buffered.len() + records.len() > ASCII_TABLE_MAX_ROWS {
                    let buffered = std::mem::take(buffered);
                    log::info!(
                        "More than {} rows, switching output to CSV",
                        ASCII_TABLE_MAX_ROWS
                    );
                    self.stage = Stage::Csv;

                    self.sink.write_line(&csv_header())?;
                    for record in buffered.iter().chain(records.iter()) {
                        self.sink.write_line(&csv_row(record))?;
                    }
                } else {
                    buffered.extend(records);
                }
            }
        }

        self.records += count;
        Ok(())
    }

    /// Render anything still buffered, flush, and move the output into place
    ///
    /// On failure the output produced so far is kept as `<target>.partial`.
    pub fn finish(mut self) -> Result<WriteSummary> {
        let mode = match self.flush_pending() {
            Ok(mode) => mode,
            Err(e) => {
                if let Err(salvage_err) = self.sink.salvage() {
                    log::warn!("Could not keep partial output: {}", salvage_err);
                }
                return Err(e);
            }
        };
        let bytes = self.sink.bytes_written();
        let path = self.sink.commit()?;

        Ok(WriteSummary {
            mode,
            path,
            records: self.records,
            bytes,
        })
    }

    /// Best-effort save of the output produced so far to `<target>.partial`
    pub fn abort(mut self) -> Result<PathBuf> {
        if let Err(e) = self.flush_pending() {
            log::warn!("Could not render buffered rows: {}", e);
        }
        self.sink.salvage()
    }

    fn flush_pending(&mut self) -> Result<OutputMode> {
        let mode = match &mut self.stage {
            Stage::Text => OutputMode::RawText,
            Stage::Csv => OutputMode::Metadata(MetadataFormat::Csv),
            Stage::Markdown => OutputMode::Metadata(MetadataFormat::Markdown),
            Stage::Pending(rows) => {
                let rows = std::mem::take(rows);
                for line in render_ascii_table(&rows) {
                    self.sink.write_line(&line)?;
                }
                OutputMode::Metadata(MetadataFormat::AsciiTable)
            }
        };
        Ok(mode)
    }
}

fn into_scored(batch: AnalyzedBatch, writer: &'static str) -> Result<Vec<AnalyzedRecord>> {
    match batch.records {
        AnalyzedRecords::Scored(records) => Ok(records),
        AnalyzedRecords::Raw(_) => Err(RefineryError::ModeMismatch(writer)),
    }
}
