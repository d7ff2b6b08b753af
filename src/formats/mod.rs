//! Sequence file formats.
//!
//! Supports:
//! - FASTA (.fasta, .fa, .fas) for reading and writing
//! - TNT (.tnt, .ss) for writing aligned multi-gene matrices
//!
//! An input may be a single FASTA file or a directory of them. Each file
//! holds one gene, named after the file stem (`ATP8.fasta` holds `ATP8`).

pub mod fasta;
pub mod scanner;
pub mod tnt;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::model::Sequence;
use fasta::{parse_fasta_file, ReadOptions};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Fasta,
    Tnt,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Fasta => write!(f, "FASTA"),
            FileFormat::Tnt => write!(f, "TNT"),
        }
    }
}

/// Errors that can occur while reading inputs.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to access input: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No FASTA files found in {0}")]
    NoInputFiles(PathBuf),

    #[error("{path}: {source}")]
    Fasta {
        path: PathBuf,
        #[source]
        source: fasta::FastaError,
    },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Detects format from file extension.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FileFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "fa" | "fas" | "fasta" => Some(FileFormat::Fasta),
        "tnt" | "ss" => Some(FileFormat::Tnt),
        _ => None,
    }
}

/// Gene name for a file: its stem, or an empty string if it has none.
pub fn gene_name_from_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_string()
}

/// Lists the FASTA files of a directory in sorted order, descending into
/// subdirectories when `recurse` is set.
pub fn collect_fasta_files<P: AsRef<Path>>(dir: P, recurse: bool) -> ParseResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recurse {
                files.extend(collect_fasta_files(&path, true)?);
            }
        } else if detect_format_from_extension(&path) == Some(FileFormat::Fasta) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Reads every sequence of a FASTA file or a directory of FASTA files.
///
/// Each file's sequences get the file stem as gene name and their
/// identifier as species.
pub fn read_sequences<P: AsRef<Path>>(input: P, recurse: bool) -> ParseResult<Vec<Sequence>> {
    let input = input.as_ref();
    let files = if input.is_dir() {
        let files = collect_fasta_files(input, recurse)?;
        if files.is_empty() {
            return Err(ParseError::NoInputFiles(input.to_path_buf()));
        }
        files
    } else {
        vec![input.to_path_buf()]
    };

    let mut sequences = Vec::new();
    for path in files {
        let options = ReadOptions::for_gene(gene_name_from_path(&path));
        let parsed = parse_fasta_file(&path, &options).map_err(|source| ParseError::Fasta {
            path: path.clone(),
            source,
        })?;
        log::info!(
            "{}: {} sequences for gene '{}'",
            path.display(),
            parsed.len(),
            options.gene
        );
        sequences.extend(parsed);
    }
    Ok(sequences)
}
