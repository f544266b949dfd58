//! Core processing engine
//!
//! Drives loader → analyzer → writer one batch at a time and keeps the run
//! counters. Processing is strictly sequential, so output order is input
//! order minus skipped and filtered lines.

use crate::analyzer::{AnalyzedBatch, Analyzer};
use crate::cli::Args;
use crate::error::{RefineryError, Result};
use crate::filter::{validate_threshold, PolicyFilter};
use crate::loader::{resolve_encoding, ChunkLoader};
use crate::output::{OutputMode, RecordWriter, DEFAULT_BUFFER_SIZE};
use crate::progress::{create_bytes_progress_bar, print_header, print_info, print_summary, print_warning};

use colored::*;
use encoding_rs::Encoding;
use indicatif::ProgressBar;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of candidates per batch
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Default output file name
pub const DEFAULT_OUTPUT_FILE: &str = "refined_list.txt";

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub output_path: PathBuf,
    pub chunk_size: usize,
    pub add_metadata: bool,
    pub markdown_table: bool,
    pub wpa2_compliant: bool,
    pub min_entropy: Option<f64>,
    pub reject_noise: bool,
    pub encoding: &'static Encoding,
    pub buffer_size: usize,
    pub quiet: bool,
    pub verbose: bool,
    /// Set from outside (Ctrl-C) to stop at the next batch boundary
    pub shutdown: Arc<AtomicBool>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            chunk_size: DEFAULT_CHUNK_SIZE,
            add_metadata: false,
            markdown_table: false,
            wpa2_compliant: false,
            min_entropy: None,
            reject_noise: false,
            encoding: encoding_rs::UTF_8,
            buffer_size: DEFAULT_BUFFER_SIZE,
            quiet: false,
            verbose: false,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ProcessorConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Self {
            output_path: args.output_file.clone(),
            chunk_size: args.chunk_size,
            add_metadata: args.add_metadata,
            markdown_table: args.markdown_table,
            wpa2_compliant: args.wpa2_compliant,
            min_entropy: args.min_entropy,
            reject_noise: args.reject_noise,
            encoding: resolve_encoding(&args.encoding)?,
            buffer_size: args.parse_buffer_size()?,
            quiet: args.quiet,
            verbose: args.verbose,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that must pass before any input is read
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RefineryError::InvalidChunkSize);
        }
        if self.markdown_table && !self.add_metadata {
            return Err(RefineryError::MarkdownWithoutMetadata);
        }
        if let Some(threshold) = self.min_entropy {
            validate_threshold(threshold)?;
        }
        if !self.encoding.is_ascii_compatible() {
            return Err(RefineryError::UnsupportedEncoding(self.encoding.name().to_string()));
        }
        Ok(())
    }
}

/// Run-level counters, updated once per batch
///
/// `total_read` counts every non-blank input line, so on a completed run
/// `total_read == total_skipped + total_filtered + total_written`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub total_read: u64,
    /// Lines dropped because they failed to decode
    pub total_skipped: u64,
    /// Records removed by policy filters
    pub total_filtered: u64,
    pub total_written: u64,
}

impl RunCounters {
    fn record_batch(&mut self, skipped: u64, filtered: u64, written: u64) {
        self.total_read += skipped + filtered + written;
        self.total_skipped += skipped;
        self.total_filtered += filtered;
        self.total_written += written;
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub counters: RunCounters,
    pub mode: OutputMode,
    pub output_path: PathBuf,
    pub bytes_written: u64,
    pub input_bytes: u64,
    pub elapsed: Duration,
}

/// Main processor
pub struct Processor {
    config: ProcessorConfig,
    analyzer: Analyzer,
}

impl Processor {
    /// Validate the configuration and build the analyzer
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;

        let policy = PolicyFilter::new(config.wpa2_compliant, config.min_entropy, config.reject_noise)?;
        let analyzer = Analyzer::new(config.add_metadata, policy);

        Ok(Self { config, analyzer })
    }

    /// Refine `input` into the configured output file
    pub fn process(&self, input: &Path) -> Result<RunReport> {
        self.process_with(input, |_| {})
    }

    /// Like [`Processor::process`], handing every analyzed batch to
    /// `observer` before it is written
    pub fn process_with<F>(&self, input: &Path, mut observer: F) -> Result<RunReport>
    where
        F: FnMut(&AnalyzedBatch),
    {
        let start = Instant::now();
        let config = &self.config;

        // Input errors surface before the output sink exists
        let mut loader = ChunkLoader::open(input, config.chunk_size, config.encoding)?;
        let input_bytes = fs::metadata(input).map(|m| m.len()).unwrap_or(0);

        if !config.quiet {
            print_header("Refining wordlist...");
            print_info(&format!("Input:  {:?}", input));
            print_info(&format!("Output: {:?}", config.output_path));
        }

        let mut writer = RecordWriter::create(
            config.output_path.clone(),
            config.add_metadata,
            config.markdown_table,
            config.buffer_size,
        )?;

        let pb = if config.quiet {
            ProgressBar::hidden()
        } else {
            create_bytes_progress_bar(input_bytes, "Processing...")
        };

        let mut counters = RunCounters::default();
        if let Err(e) = self.drive(&mut loader, &mut writer, &mut counters, &pb, &mut observer) {
            let status = match e {
                RefineryError::Interrupted => "Interrupted",
                _ => "Failed",
            };
            pb.abandon_with_message(status.red().to_string());
            match writer.abort() {
                Ok(partial) => {
                    log::warn!("Run failed, completed output kept at {:?}", partial);
                    if !config.quiet {
                        print_warning(&format!("Completed output kept at {:?}", partial));
                    }
                }
                Err(salvage_err) => log::warn!("Could not keep partial output: {}", salvage_err),
            }
            return Err(e);
        }

        pb.finish_with_message("Complete".green().to_string());

        let summary = writer.finish()?;
        log::info!("Output format: {}", summary.mode);

        let report = RunReport {
            counters,
            mode: summary.mode,
            output_path: summary.path,
            bytes_written: summary.bytes,
            input_bytes,
            elapsed: start.elapsed(),
        };

        if !config.quiet {
            print_summary(&report);
        }

        Ok(report)
    }

    fn drive<R, F>(
        &self,
        loader: &mut ChunkLoader<R>,
        writer: &mut RecordWriter,
        counters: &mut RunCounters,
        pb: &ProgressBar,
        observer: &mut F,
    ) -> Result<()>
    where
        R: BufRead,
        F: FnMut(&AnalyzedBatch),
    {
        loop {
            if self.config.shutdown.load(Ordering::SeqCst) {
                log::warn!(
                    "Interrupted after {} of {} input bytes",
                    loader.bytes_consumed(),
                    pb.length().unwrap_or(0)
                );
                return Err(RefineryError::Interrupted);
            }

            let batch = match loader.next() {
                Some(batch) => batch?,
                None => break,
            };
            let skipped = batch.skipped;
            let candidates = batch.len() as u64;

            let analyzed = self.analyzer.analyze(batch);
            observer(&analyzed);

            let filtered = analyzed.filtered;
            let written = analyzed.len() as u64;

            log::debug!(
                "Processed batch. Retained {}/{} candidates ({} undecodable)",
                written,
                candidates,
                skipped
            );

            writer.write_batch(analyzed)?;
            counters.record_batch(skipped, filtered, written);

            pb.set_position(loader.bytes_consumed());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn input(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn config(dir: &TempDir) -> ProcessorConfig {
        ProcessorConfig {
            output_path: dir.path().join("out.txt"),
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        let dir = TempDir::new().unwrap();

        let bad_chunk = ProcessorConfig {
            chunk_size: 0,
            ..config(&dir)
        };
        assert!(matches!(Processor::new(bad_chunk), Err(RefineryError::InvalidChunkSize)));

        let markdown_raw = ProcessorConfig {
            markdown_table: true,
            ..config(&dir)
        };
        assert!(matches!(
            Processor::new(markdown_raw),
            Err(RefineryError::MarkdownWithoutMetadata)
        ));

        let bad_threshold = ProcessorConfig {
            min_entropy: Some(-0.5),
            ..config(&dir)
        };
        assert!(matches!(
            Processor::new(bad_threshold),
            Err(RefineryError::InvalidThreshold(_))
        ));

        let utf16 = ProcessorConfig {
            encoding: encoding_rs::UTF_16LE,
            ..config(&dir)
        };
        assert!(matches!(
            Processor::new(utf16),
            Err(RefineryError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_counters_add_up() {
        let dir = TempDir::new().unwrap();
        let file = input(&["123456", "Tr0ub4dor&3", "", "password", "abc"]);

        let processor = Processor::new(ProcessorConfig {
            min_entropy: Some(3.0),
            chunk_size: 2,
            ..config(&dir)
        })
        .unwrap();
        let report = processor.process(file.path()).unwrap();

        let c = report.counters;
        assert_eq!(c.total_read, 4);
        assert_eq!(c.total_skipped, 0);
        assert_eq!(c.total_filtered, 3);
        assert_eq!(c.total_written, 1);
        assert_eq!(c.total_read, c.total_skipped + c.total_filtered + c.total_written);
        assert_eq!(report.mode, OutputMode::RawText);

        let text = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(text, "Tr0ub4dor&3\n");
    }

    #[test]
    fn test_observer_sees_every_batch() {
        let dir = TempDir::new().unwrap();
        let file = input(&["a", "b", "c", "d", "e"]);

        let processor = Processor::new(ProcessorConfig {
            chunk_size: 2,
            add_metadata: true,
            ..config(&dir)
        })
        .unwrap();

        let mut sizes = Vec::new();
        processor
            .process_with(file.path(), |batch| sizes.push(batch.len()))
            .unwrap();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_shutdown_keeps_completed_batches() {
        let dir = TempDir::new().unwrap();
        let file = input(&["one", "two", "three", "four", "five"]);

        let config = config(&dir);
        let shutdown = config.shutdown.clone();
        let processor = Processor::new(ProcessorConfig {
            chunk_size: 2,
            ..config
        })
        .unwrap();

        // Raised while the first batch is in flight; that batch still lands
        let result = processor.process_with(file.path(), |_| shutdown.store(true, Ordering::SeqCst));
        assert!(matches!(result, Err(RefineryError::Interrupted)));

        let partial = fs::read_to_string(dir.path().join("out.txt.partial")).unwrap();
        assert_eq!(partial, "one\ntwo\n");
        assert!(!dir.path().join("out.txt").exists());

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["out.txt.partial".to_string()]);
    }

    #[test]
    fn test_missing_input_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let processor = Processor::new(config(&dir)).unwrap();

        let result = processor.process(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(RefineryError::Open { .. })));
        assert!(!dir.path().join("out.txt").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
