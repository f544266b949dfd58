//! Wordlist Refinery - password wordlist cleaning and scoring
//!
//! Main entry point for the command-line application.

use clap::Parser;
use std::process;
use std::sync::atomic::Ordering;

use wordlist_refinery::cli::Args;
use wordlist_refinery::processor::{Processor, ProcessorConfig};
use wordlist_refinery::RefineryError;
use wordlist_refinery::progress::{print_banner, print_error, print_header, print_info, print_success, print_warning, Preview, PREVIEW_ROWS};

fn main() {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    } else if !args.quiet && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    if let Err(e) = run(args) {
        print_error(&format!("{}", e));

        // Print chain of errors
        for cause in e.chain().skip(1) {
            print_error(&format!("  Caused by: {}", cause));
        }

        match e.downcast_ref::<RefineryError>() {
            Some(RefineryError::Interrupted) => process::exit(130),
            Some(err) if err.is_validation() => print_info("Run with --help for usage"),
            _ => {}
        }

        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if !args.quiet {
        print_banner();
    }

    // All validation happens here, before the input is opened
    let config = ProcessorConfig::from_args(&args)?;

    if !args.quiet && args.verbose {
        print_config(&args, &config);
    }

    // Ctrl+C: stop at the next batch boundary and keep completed output
    let shutdown = config.shutdown.clone();
    let quiet = args.quiet;
    ctrlc::set_handler(move || {
        if !quiet {
            print_warning("Stopping after the current batch...");
        }
        shutdown.store(true, Ordering::SeqCst);
    })
    .ok();

    let processor = Processor::new(config)?;

    let report = if args.preview && !args.quiet {
        let mut preview = Preview::new(PREVIEW_ROWS);
        let report = processor.process_with(&args.input, |batch| preview.observe(batch))?;
        preview.finish();
        report
    } else {
        processor.process(&args.input)?
    };

    if !args.quiet {
        print_success(&format!(
            "Refined list saved to {:?} ({} records)",
            report.output_path, report.counters.total_written
        ));
    }

    Ok(())
}

/// Print configuration summary
fn print_config(args: &Args, config: &ProcessorConfig) {
    print_header("Configuration");

    print_info(&format!("Input:        {:?}", args.input));
    print_info(&format!("Output:       {:?}", config.output_path));
    print_info(&format!("Chunk size:   {}", config.chunk_size));
    print_info(&format!("Encoding:     {}", config.encoding.name()));
    print_info(&format!("Metadata:     {}", config.add_metadata));
    print_info(&format!("Markdown:     {}", config.markdown_table));
    print_info(&format!("WPA2 only:    {}", config.wpa2_compliant));
    print_info(&format!("Reject noise: {}", config.reject_noise));

    if let Some(threshold) = config.min_entropy {
        print_info(&format!("Min entropy:  {}", threshold));
    }

    print_info(&format!("Buffer size:  {} KB", config.buffer_size / 1024));
}
