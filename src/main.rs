//! seqmatrix - FASTA to TNT converter
//!
//! ## Usage
//!
//! ```bash
//! seqmatrix -i genes/ -F tnt -o matrix.tnt --title "Hominids" --outgroup "Pan troglodytes"
//! seqmatrix -i ATP8.fasta -o cleaned.fasta
//! cat ATP8.fasta | seqmatrix -F tnt
//! ```
//!
//! A directory input is searched for `.fa`, `.fas` and `.fasta` files; each
//! file is one gene, named after its file stem.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use seqmatrix::alphabet::Classifier;
use seqmatrix::formats::fasta::{parse_fasta, write_fasta, ReadOptions};
use seqmatrix::formats::read_sequences;
use seqmatrix::formats::tnt::TntMatrix;
use seqmatrix::model::Sequence;

/// Input format for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormatArg {
    /// FASTA format
    Fasta,
}

/// Output format for command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormatArg {
    /// FASTA format, one line per sequence
    Fasta,
    /// TNT xread matrix with gene blocks
    Tnt,
}

/// Convert FASTA sequence collections to FASTA or TNT
///
/// Reads one FASTA file, a directory of per-gene FASTA files, or stdin,
/// and writes FASTA or a TNT matrix to a file or stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input format
    #[arg(short = 'f', long = "input-format", value_enum, default_value = "fasta")]
    input_format: InputFormatArg,

    /// Output format
    #[arg(short = 'F', long = "output-format", value_enum, default_value = "fasta")]
    output_format: OutputFormatArg,

    /// Input file or directory. Use "-" for stdin.
    #[arg(short = 'i', long = "input", default_value = "-")]
    input: String,

    /// Output file. Use "-" for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,

    /// Title for TNT output
    #[arg(short = 't', long = "title", default_value = "")]
    title: String,

    /// Taxon written first in TNT output (must match a species name from the input)
    #[arg(long = "outgroup")]
    outgroup: Option<String>,

    /// Do not descend into subdirectories of a directory input
    #[arg(long = "no-recurse")]
    no_recurse: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

/// Initializes logging; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Reads sequences from stdin, a file, or a directory.
fn read_input(format: InputFormatArg, input: &str, recurse: bool) -> Result<Vec<Sequence>> {
    log::debug!("Reading {:?} from '{}'", format, input);
    if input == "-" {
        let stdin = io::stdin();
        return parse_fasta(stdin.lock(), &ReadOptions::for_gene(""))
            .context("Failed to parse FASTA from stdin");
    }
    let path = Path::new(input);
    if !path.exists() {
        anyhow::bail!("Input '{}' does not exist", input);
    }
    Ok(read_sequences(path, recurse)?)
}

/// Logs how many sequences look like DNA, protein, and so on.
fn report_types(sequences: &[Sequence]) {
    let classifier = Classifier::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for seq in sequences {
        *counts.entry(classifier.classify(seq).to_string()).or_default() += 1;
    }
    for (kind, count) in counts {
        log::info!("{} {} sequences", count, kind);
    }
}

/// Renders the output fully in memory so a failed conversion writes nothing.
fn convert(args: &Args, sequences: Vec<Sequence>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match args.output_format {
        OutputFormatArg::Fasta => write_fasta(&mut buffer, &sequences)?,
        OutputFormatArg::Tnt => {
            eprintln!("Output format is TNT; serializing");
            let mut matrix = TntMatrix::new(args.title.clone());
            if let Some(outgroup) = &args.outgroup {
                matrix.set_outgroup(outgroup.clone());
            }
            matrix.add_sequences(sequences);
            matrix.write_matrix(&mut buffer)?;
            log::info!(
                "{} taxa across {} genes",
                matrix.taxon_count(),
                matrix.gene_count()
            );
        }
    }
    Ok(buffer)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let sequences = read_input(args.input_format, &args.input, !args.no_recurse)?;
    if sequences.is_empty() {
        anyhow::bail!("No sequences found in '{}'", args.input);
    }
    report_types(&sequences);
    let count = sequences.len();

    let output = convert(&args, sequences)?;

    if args.output == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&output)?;
        handle.flush()?;
    } else {
        std::fs::write(&args.output, &output)
            .with_context(|| format!("Failed to write {}", args.output))?;
        eprintln!("Wrote {} sequences to {}", count, args.output);
    }

    Ok(())
}
