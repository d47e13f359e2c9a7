//! CLI tool for extracting timeline milestones from PowerPoint decks.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use timeline_core::{Deck, DeckFormat, DeckTimeline, TimelineConfig, TimelineExtractor};

/// Extract dated milestones and spans from timeline slides.
#[derive(Parser, Debug)]
#[command(name = "timeline-extract")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input deck file(s) (.pptx, or a .json shape dump)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print output to stdout instead of writing to file
    #[arg(short, long)]
    print: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// JSON file overriding extraction thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Year used when a slide has no year header
    #[arg(long)]
    year: Option<i32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Captions, milestones and spans as pretty JSON
    Json,
    /// One caption per line
    Captions,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "timeline.json",
            Self::Captions => "captions.txt",
        }
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

    let extractor = TimelineExtractor::new().with_config(load_config(&args)?);

    let failed = run(&args, &extractor);
    if failed > 0 {
        anyhow::bail!("{} of {} input(s) failed", failed, args.input.len());
    }

    Ok(())
}

/// Process every input, reporting failures without stopping. Returns the
/// number of inputs that failed.
fn run(args: &Args, extractor: &TimelineExtractor) -> usize {
    let mut failed = 0;

    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        let result = process_file(input_path, args, extractor).and_then(|output| {
            if args.print {
                print!("{}", output);
                return Ok(());
            }
            let output_path = get_output_path(input_path, args.output.as_ref(), args.format)?;
            write_output(&output_path, &output)?;
            if args.verbose {
                eprintln!("Written to: {}", output_path.display());
            }
            Ok(())
        });

        if let Err(e) = result {
            eprintln!("Error processing {}: {:#}", input_path.display(), e);
            failed += 1;
        }
    }

    failed
}

/// Build the extraction config from `--config` and `--year`.
fn load_config(args: &Args) -> Result<TimelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            TimelineConfig::from_json_str(&json)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => TimelineConfig::default(),
    };

    if let Some(year) = args.year {
        config = config.with_fallback_year(year);
    }

    Ok(config)
}

/// Process a single deck file.
fn process_file(input_path: &Path, args: &Args, extractor: &TimelineExtractor) -> Result<String> {
    let deck = load_deck(input_path)?;

    if args.verbose {
        eprintln!("  Found {} slides", deck.slides.len());
    }

    let timeline = extractor.extract_deck(&deck);

    if args.verbose {
        eprintln!(
            "  Extracted {} milestones, {} spans",
            timeline.milestone_records().len(),
            timeline.span_records().len()
        );
    }

    render(&timeline, args.format)
}

/// Read a deck, detecting the format from its header or extension.
fn load_deck(input_path: &Path) -> Result<Deck> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let mut reader = BufReader::new(file);

    // Short files are fine here; a JSON deck can be smaller than a ZIP header.
    let mut magic = Vec::with_capacity(8);
    reader
        .by_ref()
        .take(8)
        .read_to_end(&mut magic)
        .with_context(|| "Failed to read file header")?;

    let format = detect_format(input_path, &magic)?;
    let source = input_path.display().to_string();

    let deck = match format {
        DeckFormat::Pptx => {
            log::debug!("Parsing as PPTX");
            let file = File::open(input_path)?;
            timeline_pptx::PptxParser::new().parse(BufReader::new(file), &source)?
        }
        DeckFormat::Json => {
            log::debug!("Parsing as JSON deck");
            let json = std::fs::read_to_string(input_path)
                .with_context(|| format!("Failed to read {}", input_path.display()))?;
            let mut deck = Deck::from_json_str(&json)?;
            if deck.source.is_empty() {
                deck.source = source;
            }
            deck
        }
    };

    Ok(deck)
}

/// Magic bytes first, then the file extension.
fn detect_format(input_path: &Path, magic: &[u8]) -> Result<DeckFormat> {
    let format = DeckFormat::from_magic(magic)?
        .or_else(|| {
            input_path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(DeckFormat::from_extension)
        })
        .ok_or_else(|| anyhow::anyhow!("Could not detect file format"))?;
    Ok(format)
}

/// Serialize a deck timeline in the requested format.
fn render(timeline: &DeckTimeline, format: OutputFormat) -> Result<String> {
    let output = match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&timeline.facts())?;
            json.push('\n');
            json
        }
        OutputFormat::Captions => timeline
            .captions()
            .iter()
            .map(|c| format!("{}\n", c))
            .collect(),
    };
    Ok(output)
}

/// Determine the output path for a processed file.
fn get_output_path(
    input_path: &Path,
    output_dir: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = format!("{}.{}", stem, format.extension());

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

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
