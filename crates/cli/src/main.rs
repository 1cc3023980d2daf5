//! CLI tool for extracting key-value facts from slide decks.

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::{ExtractOptions, Extraction, Extractor};
use deck_pptx::PptxParser;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Extract `■`-bulleted key-value records from PowerPoint decks as JSON.
#[derive(Parser, Debug)]
#[command(name = "deck-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file(s) (.pptx)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// First slide to extract (1-based, default: first slide)
    #[arg(long)]
    start: Option<usize>,

    /// Last slide to extract, inclusive (default: last slide)
    #[arg(long)]
    end: Option<usize>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print JSON to stdout instead of writing to file
    #[arg(short, long)]
    print: bool,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Keep bullet values whole instead of splitting out labelled sub-fields
    #[arg(long)]
    no_secondary_split: bool,

    /// Shortest sub-field label accepted by the secondary split
    #[arg(long, default_value = "2")]
    min_key_len: usize,

    /// Longest sub-field label accepted by the secondary split
    #[arg(long, default_value = "8")]
    max_key_len: usize,

    /// Keep footer page numbers in the output
    #[arg(long)]
    keep_page_numbers: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .with_secondary_split(!self.no_secondary_split)
            .with_secondary_key_len(self.min_key_len..=self.max_key_len)
            .with_skip_page_numbers(!self.keep_page_numbers)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if args.min_key_len > args.max_key_len {
        anyhow::bail!(
            "--min-key-len ({}) must not exceed --max-key-len ({})",
            args.min_key_len,
            args.max_key_len
        );
    }

    let extractor = Extractor::with_options(args.extract_options());

    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, &args, &extractor) {
            Ok(output) => {
                if args.print {
                    println!("{}", output);
                } else {
                    let output_path = get_output_path(input_path, args.output.as_ref())?;
                    write_output(&output_path, &output)?;
                    if args.verbose {
                        eprintln!("Written to: {}", output_path.display());
                    }
                }
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
            }
        }
    }

    Ok(())
}

/// Process a single PowerPoint file into serialized JSON.
fn process_file(input_path: &Path, args: &Args, extractor: &Extractor) -> Result<String> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let reader = BufReader::new(file);

    log::debug!("Parsing as PPTX");
    let document = PptxParser::new()
        .parse(reader)
        .with_context(|| format!("Failed to parse {}", input_path.display()))?;

    if args.verbose {
        eprintln!("  Found {} slides", document.slide_count());
    }

    let extraction = extractor
        .try_extract(&document, args.start, args.end)
        .context("Invalid page range")?;

    if args.verbose {
        eprintln!(
            "  Extracted {} records under {} titles",
            extraction.record_count(),
            extraction.len()
        );
    }

    to_json(&extraction, args.compact)
}

fn to_json(extraction: &Extraction, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(extraction)
    } else {
        serde_json::to_string_pretty(extraction)
    };
    json.context("Failed to serialize extraction")
}

/// Determine the timestamped output path for a processed file.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let output_filename = output_file_name(stem, &timestamp.to_string());

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => {
            if let Some(parent) = input_path.parent() {
                parent.join(output_filename)
            } else {
                PathBuf::from(output_filename)
            }
        }
    };

    Ok(output_path)
}

fn output_file_name(stem: &str, timestamp: &str) -> String {
    format!("{}_extracted_{}.json", stem, timestamp)
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
