//! Progress display module
//!
//! Styled console messages, the byte progress bar, the end-of-run summary
//! and the analyzed-row preview.

use crate::analyzer::{AnalyzedBatch, AnalyzedRecord, ComplexityFlags};
use crate::processor::RunReport;

use bytesize::ByteSize;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Rows shown by the console preview
pub const PREVIEW_ROWS: usize = 20;

/// Passwords longer than this are cut in the preview (never in files)
const PREVIEW_PASSWORD_WIDTH: usize = 32;

/// Print the application banner
pub fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                                                                              ║
║                           W O R D L I S T                                    ║
║                         R E F I N E R Y                                      ║
║                                                                              ║
║            Entropy scoring · Policy filtering · Adaptive output              ║
║                                                              v1.0.0          ║
╚══════════════════════════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner.green());
}

/// Print a section header
pub fn print_header(text: &str) {
    println!("\n{} {}", "▶".green(), text.green().bold());
}

/// Print an info message
pub fn print_info(text: &str) {
    println!("  {} {}", "ℹ".cyan(), text);
}

/// Print a success message
pub fn print_success(text: &str) {
    println!("  {} {}", "✔".green(), text.green());
}

/// Print a warning message
pub fn print_warning(text: &str) {
    println!("  {} {}", "⚠".yellow(), text.yellow());
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".red(), text.red());
}

/// Create a bytes-based progress bar
pub fn create_bytes_progress_bar(total_bytes: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    pb.set_style(style);

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Print final statistics
pub fn print_summary(report: &RunReport) {
    let c = &report.counters;
    let secs = report.elapsed.as_secs_f64();
    let lines_per_sec = if secs > 0.0 {
        c.total_read as f64 / secs
    } else {
        0.0
    };

    println!();
    println!("{}", "═".repeat(60).green());
    println!("{}", "                    PROCESSING COMPLETE".green().bold());
    println!("{}", "═".repeat(60).green());
    println!();

    println!("  {} {}", "Lines read:     ".green(), format_number(c.total_read));
    if c.total_skipped > 0 {
        println!("  {} {}", "Undecodable:    ".yellow(), format_number(c.total_skipped).yellow());
    } else {
        println!("  {} {}", "Undecodable:    ".green(), 0);
    }
    println!("  {} {}", "Filtered out:   ".yellow(), format_number(c.total_filtered));
    println!(
        "  {} {}",
        "Written:        ".green().bold(),
        format_number(c.total_written).green().bold()
    );
    println!();

    println!("  {} {}", "Format:         ".green(), report.mode);
    println!("  {} {:?}", "Output:         ".green(), report.output_path);
    println!("  {} {}", "Output size:    ".green(), ByteSize(report.bytes_written));
    println!("  {} {}", "Input size:     ".green(), ByteSize(report.input_bytes));
    println!();
    println!("  {} {}", "Duration:       ".green(), format_duration(report.elapsed));
    println!("  {} {:.2} lines/sec", "Throughput:     ".green(), lines_per_sec);
    println!();
    println!("{}", "═".repeat(60).green());
}

/// Console preview of the first analyzed rows of a run
#[derive(Debug)]
pub struct Preview {
    limit: usize,
    shown: usize,
    hidden: u64,
}

impl Preview {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            shown: 0,
            hidden: 0,
        }
    }

    /// Print rows from `batch` until the limit is reached, counting the rest
    pub fn observe(&mut self, batch: &AnalyzedBatch) {
        let lines = self.take_lines(batch);
        if lines.is_empty() {
            return;
        }

        if self.shown == lines.len() {
            print_header("Preview");
        }
        for line in lines {
            println!("  {}", line);
        }
    }

    /// Print the truncation notice if rows were left out
    pub fn finish(&self) {
        if self.hidden > 0 {
            println!(
                "  {}",
                format!("... {} more rows not shown", format_number(self.hidden)).bright_black()
            );
        }
    }

    /// Rows left out of the preview so far
    pub fn hidden(&self) -> u64 {
        self.hidden
    }

    fn take_lines(&mut self, batch: &AnalyzedBatch) -> Vec<String> {
        let room = self.limit - self.shown;

        let lines: Vec<String> = match batch.scored() {
            Some(records) => records.iter().take(room).map(preview_record).collect(),
            None => batch
                .passwords()
                .take(room)
                .map(|p| truncate_for_display(p, PREVIEW_PASSWORD_WIDTH).into_owned())
                .collect(),
        };

        self.shown += lines.len();
        self.hidden += (batch.len() - lines.len()) as u64;
        lines
    }
}

fn preview_record(record: &AnalyzedRecord) -> String {
    format!(
        "{:<width$}  {:>7.4}  {:<9}  {}",
        truncate_for_display(&record.password, PREVIEW_PASSWORD_WIDTH),
        record.entropy,
        record.strength.label(),
        flag_string(&record.flags),
        width = PREVIEW_PASSWORD_WIDTH
    )
}

/// Compact `ULDS` rendering of the complexity flags, `-` for absent classes
fn flag_string(flags: &ComplexityFlags) -> String {
    [
        (flags.has_upper, 'U'),
        (flags.has_lower, 'L'),
        (flags.has_digit, 'D'),
        (flags.has_special, 'S'),
    ]
    .iter()
    .map(|&(set, c)| if set { c } else { '-' })
    .collect()
}

/// Cut `text` to `max` characters for display, marking the cut with `…`
pub fn truncate_for_display(text: &str, max: usize) -> std::borrow::Cow<'_, str> {
    if text.chars().count() <= max {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    std::borrow::Cow::Owned(cut)
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalyzedRecords, Analyzer};
    use crate::filter::PolicyFilter;
    use crate::loader::{Batch, PasswordCandidate};

    fn analyzed(n: usize, metadata: bool) -> AnalyzedBatch {
        let batch = Batch {
            candidates: (0..n)
                .filter_map(|i| PasswordCandidate::new(format!("pw{}", i)))
                .collect(),
            skipped: 0,
        };
        Analyzer::new(metadata, PolicyFilter::default()).analyze(batch)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(123), "123");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_truncate_for_display() {
        assert_eq!(truncate_for_display("short", 10), "short");
        assert_eq!(truncate_for_display("exactlyten", 10), "exactlyten");
        assert_eq!(truncate_for_display("longerthanten", 10), "longertha…");
        assert_eq!(truncate_for_display("ééééé", 3), "éé…");
    }

    #[test]
    fn test_flag_string() {
        let record = AnalyzedRecord::new("Aa1!".to_string());
        assert_eq!(flag_string(&record.flags), "ULDS");
        let record = AnalyzedRecord::new("abc".to_string());
        assert_eq!(flag_string(&record.flags), "-L--");
    }

    #[test]
    fn test_preview_limits_rows_across_batches() {
        let mut preview = Preview::new(PREVIEW_ROWS);

        assert_eq!(preview.take_lines(&analyzed(15, true)).len(), 15);
        assert_eq!(preview.take_lines(&analyzed(15, true)).len(), 5);
        assert_eq!(preview.take_lines(&analyzed(15, true)).len(), 0);
        assert_eq!(preview.hidden(), 25);
    }

    #[test]
    fn test_preview_raw_rows() {
        let mut preview = Preview::new(3);
        let batch = AnalyzedBatch {
            records: AnalyzedRecords::Raw(
                ["one", "two"].iter().filter_map(|w| PasswordCandidate::new(*w)).collect(),
            ),
            filtered: 0,
        };

        assert_eq!(preview.take_lines(&batch), vec!["one", "two"]);
        assert_eq!(preview.take_lines(&analyzed(4, false)), vec!["pw0"]);
        assert_eq!(preview.hidden(), 3);
    }
}
