//! # Wordlist Refinery
//!
//! Streaming cleanup and scoring of password wordlists.
//!
//! ## Features
//!
//! - **Bounded memory**: input is read and processed in fixed-size batches
//! - **Robust decoding**: undecodable lines are dropped and counted, never fatal
//! - **Scoring**: Shannon entropy, strength label and character-class flags
//! - **Policy filters**: WPA2-PSK compliance, minimum entropy, noise rejection
//! - **Adaptive output**: plain text, ASCII table, CSV or markdown depending
//!   on mode and final row count
//! - **Safe finalization**: output is written to a temporary file and renamed
//!   into place on success
//!
//! ## Usage
//!
//! ```bash
//! # Keep WPA2-compliant candidates
//! wordlist-refinery rockyou.txt --wpa2-compliant -o wpa2.txt
//!
//! # Score with metadata, entropy >= 3 bits
//! wordlist-refinery leak.txt --add-metadata --min-entropy 3.0 -o scored.csv
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use wordlist_refinery::processor::{Processor, ProcessorConfig};
//! use std::path::{Path, PathBuf};
//!
//! let config = ProcessorConfig {
//!     output_path: PathBuf::from("refined.csv"),
//!     add_metadata: true,
//!     min_entropy: Some(3.0),
//!     ..Default::default()
//! };
//!
//! let processor = Processor::new(config).unwrap();
//! let report = processor.process(Path::new("wordlist.txt")).unwrap();
//! println!("{} written as {}", report.counters.total_written, report.mode);
//! ```

pub mod analyzer;
pub mod cli;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod processor;
pub mod progress;

pub use cli::Args;
pub use error::{RefineryError, Result};
pub use processor::{Processor, ProcessorConfig, RunCounters, RunReport};
