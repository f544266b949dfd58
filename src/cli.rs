//! Command-line interface definition for wordlist-refinery
//!
//! Provides argument parsing for the refinement tool. Semantic validation
//! (flag combinations, thresholds) lives in [`crate::processor::ProcessorConfig`].

use crate::error::{RefineryError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Password wordlist refinement: entropy scoring, policy filters, adaptive output
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wordlist-refinery",
    version,
    about = "Clean, score and filter large password wordlists",
    long_about = r#"
Stream a newline-delimited wordlist, drop undecodable and blank lines,
optionally score every candidate (Shannon entropy, strength, character
classes) and filter by WPA2 compliance or minimum entropy.

OUTPUT FORMATS:
    (default)                  plain text, one password per line
    --add-metadata             ASCII table up to 5000 rows, CSV above
    --add-metadata --markdown-table
                               GitHub-flavoured markdown table

STRENGTH LABELS (Shannon entropy, bits):
    Very Weak  < 2.5
    Weak       2.5 - 3.5
    Moderate   3.5 - 4.5
    Strong     >= 4.5

EXAMPLES:
    # Keep WPA2-valid candidates
    wordlist-refinery rockyou.txt --wpa2-compliant -o wpa2.txt

    # Score everything with entropy >= 3 bits into CSV/table
    wordlist-refinery leak.txt --min-entropy 3.0 --add-metadata -o scored.csv

    # Markdown report of a small list
    wordlist-refinery top100.txt --add-metadata --markdown-table -o report.md
"#
)]
pub struct Args {
    /// Source wordlist
    #[arg(value_name = "INPUT_FILE")]
    pub input: PathBuf,

    /// Output file path
    #[arg(short, long, value_name = "PATH", default_value = "refined_list.txt")]
    pub output_file: PathBuf,

    /// Minimum Shannon entropy (bits) a password must reach
    #[arg(long, value_name = "FLOAT")]
    pub min_entropy: Option<f64>,

    /// Keep only WPA2-PSK compliant passwords (8-63 printable ASCII characters)
    #[arg(long, default_value_t = false)]
    pub wpa2_compliant: bool,

    /// Drop lines with whitespace, URLs, domains or leak-site names
    #[arg(long, default_value_t = false)]
    pub reject_noise: bool,

    /// Candidates processed per batch
    #[arg(long, value_name = "INT", default_value_t = 100_000)]
    pub chunk_size: usize,

    /// Add entropy, strength and complexity columns
    #[arg(long, default_value_t = false)]
    pub add_metadata: bool,

    /// Write a markdown table (requires --add-metadata)
    #[arg(long, default_value_t = false)]
    pub markdown_table: bool,

    /// Input text encoding label (utf-8, latin1, windows-1251, ...)
    #[arg(long, value_name = "LABEL", default_value = "utf-8")]
    pub encoding: String,

    /// Output buffer size (e.g. 512KB, 8MB)
    #[arg(long, value_name = "SIZE", default_value = "8MB")]
    pub buffer_size: String,

    /// Print the first 20 analyzed rows
    #[arg(long, default_value_t = false)]
    pub preview: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Parse buffer size string to bytes
    pub fn parse_buffer_size(&self) -> Result<usize> {
        parse_size(&self.buffer_size)
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size_str: &str) -> Result<usize> {
    let upper = size_str.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    let num: usize = num_str
        .trim()
        .parse()
        .map_err(|_| RefineryError::InvalidSize(size_str.to_string()))?;

    match num.checked_mul(multiplier) {
        Some(0) | None => Err(RefineryError::InvalidSize(size_str.to_string())),
        Some(bytes) => Ok(bytes),
    }
}
