//! FASTA reader and writer.
//!
//! This module drives the [`Scanner`] over a FASTA stream and turns its
//! tokens into [`Sequence`] values. It supports multi-line sequences and
//! bracketed ambiguity groups.
//!
//! ## FASTA Format
//!
//! ```text
//! >Homo sapiens
//! ACGTACGT[AG]T
//! ACGT
//! >Homo erectus
//! TGCATGCATGCA...
//! ```
//!
//! The whole header line after `>` is the sequence name. On output, spaces in
//! names become underscores and each sequence is written on a single line.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use thiserror::Error;

use super::scanner::{ScanError, Scanner, Token};
use crate::model::Sequence;

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to read input: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed FASTA at line {line}: two sequence markers with no data between them")]
    ConsecutiveIdentifiers { line: usize },

    #[error("Malformed FASTA at line {line}: data with no preceding identifier")]
    DataWithoutIdentifier { line: usize },

    #[error("Invalid FASTA content: {0}")]
    Scan(#[from] ScanError),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// Options applied to every sequence read from one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Copy the identifier into the species field.
    pub species_from_id: bool,
    /// Gene assigned to every sequence of the stream.
    pub gene: String,
}

impl ReadOptions {
    /// Options for a stream holding one gene, with species taken from identifiers.
    pub fn for_gene(gene: impl Into<String>) -> Self {
        Self {
            species_from_id: true,
            gene: gene.into(),
        }
    }
}

/// Reader progress between tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    NotStarted,
    SawIdentifier,
    SawData,
}

/// Parses FASTA content from an in-memory buffer.
pub fn parse_fasta_bytes(input: &[u8], options: &ReadOptions) -> FastaResult<Vec<Sequence>> {
    let mut scanner = Scanner::new(input);
    let mut sequences = Vec::new();
    let mut state = ReadState::NotStarted;
    let mut pending: Option<String> = None;

    loop {
        let line = scanner.line();
        match scanner.scan() {
            Token::Identifier { literal, .. } => {
                if state == ReadState::SawIdentifier {
                    return Err(FastaError::ConsecutiveIdentifiers { line });
                }
                pending = Some(literal);
                state = ReadState::SawIdentifier;
            }
            Token::Data { literal, length } => {
                let name = match (state, pending.take()) {
                    (ReadState::SawIdentifier, Some(name)) => name,
                    _ => return Err(FastaError::DataWithoutIdentifier { line }),
                };
                let species = if options.species_from_id {
                    name.clone()
                } else {
                    String::new()
                };
                sequences.push(Sequence::from_scan(
                    name,
                    species,
                    options.gene.clone(),
                    literal,
                    length,
                ));
                state = ReadState::SawData;
            }
            Token::Whitespace(_) => {}
            Token::EndOfInput => break,
            Token::Invalid(err) => return Err(err.into()),
        }
    }

    if let Some(name) = pending {
        log::warn!("Identifier '{}' at end of input has no sequence data; skipped", name);
    }
    log::debug!(
        "Read {} sequences for gene '{}'",
        sequences.len(),
        options.gene
    );
    Ok(sequences)
}

/// Parses FASTA content from a string.
///
/// Useful for testing or processing in-memory data.
pub fn parse_fasta_str(content: &str, options: &ReadOptions) -> FastaResult<Vec<Sequence>> {
    parse_fasta_bytes(content.as_bytes(), options)
}

/// Parses FASTA content from a reader. The input is read fully before scanning.
pub fn parse_fasta<R: Read>(mut reader: R, options: &ReadOptions) -> FastaResult<Vec<Sequence>> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;
    parse_fasta_bytes(&content, options)
}

/// Parses a FASTA file.
///
/// # Examples
///
/// ```no_run
/// use seqmatrix::formats::fasta::{parse_fasta_file, ReadOptions};
///
/// let sequences = parse_fasta_file("ATP8.fasta", &ReadOptions::for_gene("ATP8")).unwrap();
/// println!("Loaded {} sequences", sequences.len());
/// ```
pub fn parse_fasta_file<P: AsRef<Path>>(path: P, options: &ReadOptions) -> FastaResult<Vec<Sequence>> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(1024 * 1024, file);
    parse_fasta(reader, options)
}

/// Writes sequences as FASTA, one line of data per record, followed by a blank line.
///
/// Records with no data are skipped with a warning: an identifier line with
/// nothing under it cannot be read back.
pub fn write_fasta<W: Write>(writer: &mut W, sequences: &[Sequence]) -> std::io::Result<()> {
    for seq in sequences {
        if seq.is_empty() {
            log::warn!("Skipping '{}': no sequence data", seq.name);
            continue;
        }
        writeln!(writer, ">{}", seq.safe_name())?;
        writer.write_all(seq.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORYG: &str = "TACTTTAGCGGTAATGTATAGGTATACAACTTAAGCGCCATCCATTTTAAGGGCTAGTTGCTTCGGCAGGTGAGTTGTT";

    fn read(content: &str) -> FastaResult<Vec<Sequence>> {
        parse_fasta_str(content, &ReadOptions::for_gene("X"))
    }

    #[test]
    fn test_parse_multiline_records() {
        let sequences = read(">foo\nATG\nCGTA\n>bar\nTATGC\nGTAT").unwrap();

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].name, "foo");
        assert_eq!(sequences[0].as_str(), "ATGCGTA");
        assert_eq!(sequences[0].len(), 7);
        assert_eq!(sequences[1].name, "bar");
        assert_eq!(sequences[1].as_str(), "TATGCGTAT");
        assert_eq!(sequences[1].len(), 9);
        assert!(sequences.iter().all(|s| s.gene == "X"));
    }

    #[test]
    fn test_species_from_identifier() {
        let sequences = read(">Homo sapiens\nACGT\n").unwrap();
        assert_eq!(sequences[0].name, "Homo sapiens");
        assert_eq!(sequences[0].species, "Homo sapiens");

        let options = ReadOptions {
            species_from_id: false,
            gene: String::new(),
        };
        let sequences = parse_fasta_str(">Homo sapiens\nACGT\n", &options).unwrap();
        assert_eq!(sequences[0].species, "");
        assert_eq!(sequences[0].gene, "");
    }

    #[test]
    fn test_ambiguity_groups_are_kept() {
        let sequences = read(">seq1\nATAGCT[AC]\nG\n").unwrap();
        assert_eq!(sequences[0].as_str(), "ATAGCT[AC]G");
        assert_eq!(sequences[0].len(), 8);
    }

    #[test]
    fn test_leading_and_blank_lines() {
        let sequences = read("\n\n>seq1\n\nACGT\n\n>seq2\nTGCA\n\n").unwrap();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[1].as_str(), "TGCA");
    }

    #[test]
    fn test_empty_input() {
        assert!(read("").unwrap().is_empty());
    }

    #[test]
    fn test_consecutive_identifiers() {
        let result = read(">seq1\n>seq2\nACGT\n");
        assert!(matches!(
            result,
            Err(FastaError::ConsecutiveIdentifiers { line: 2 })
        ));
    }

    #[test]
    fn test_data_without_identifier() {
        let result = read("ACGT\n>seq1\nTGCA\n");
        assert!(matches!(
            result,
            Err(FastaError::DataWithoutIdentifier { line: 1 })
        ));
    }

    #[test]
    fn test_invalid_characters() {
        let result = read(">seq1\nAC*GT\n");
        assert!(matches!(
            result,
            Err(FastaError::Scan(ScanError::InvalidCharacter { ch: '*', line: 2 }))
        ));

        let result = read(">seq1\nAC[GT\n>seq2\nACGT\n");
        assert!(matches!(
            result,
            Err(FastaError::Scan(ScanError::UnbalancedGroup { .. }))
        ));
    }

    #[test]
    fn test_trailing_identifier_is_skipped() {
        let sequences = read(">seq1\nACGT\n>orphan\n").unwrap();
        assert_eq!(sequences.len(), 1);
    }

    #[test]
    fn test_parse_from_reader() {
        let content = b">seq1\nACGT\n".to_vec();
        let sequences = parse_fasta(&content[..], &ReadOptions::default()).unwrap();
        assert_eq!(sequences[0].as_str(), "ACGT");
    }

    #[test]
    fn test_write_one() {
        let mut output = Vec::new();
        write_fasta(&mut output, &[Sequence::new("Oryg luct 1033", ORYG)]).unwrap();
        let expected = format!(">Oryg_luct_1033\n{}\n\n", ORYG);
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_two() {
        let mut output = Vec::new();
        let sequences = vec![
            Sequence::new("Oryg luct 1033", ORYG),
            Sequence::new("Sequence Two", ORYG),
        ];
        write_fasta(&mut output, &sequences).unwrap();
        let expected = format!(">Oryg_luct_1033\n{}\n>Sequence_Two\n{}\n\n", ORYG, ORYG);
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_write_then_read() {
        let sequences = vec![
            Sequence::new("seq_a", "AT[AG]C--"),
            Sequence::new("seq_b", "ACGTNNNN"),
        ];
        let mut output = Vec::new();
        write_fasta(&mut output, &sequences).unwrap();

        let options = ReadOptions::default();
        let read_back = parse_fasta_bytes(&output, &options).unwrap();
        assert_eq!(read_back.len(), 2);
        for (original, parsed) in sequences.iter().zip(&read_back) {
            assert_eq!(original.name, parsed.name);
            assert_eq!(original.as_bytes(), parsed.as_bytes());
            assert_eq!(original.len(), parsed.len());
        }
    }

    #[test]
    fn test_write_skips_empty_records() {
        let sequences = vec![Sequence::new("a", ""), Sequence::new("b", "AC")];
        let mut output = Vec::new();
        write_fasta(&mut output, &sequences).unwrap();
        assert_eq!(String::from_utf8(output.clone()).unwrap(), ">b\nAC\n\n");

        let read_back = parse_fasta_bytes(&output, &ReadOptions::default()).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].name, "b");
        assert_eq!(read_back[0].as_str(), "AC");
    }

    #[test]
    fn test_undecodable_identifier() {
        let result = parse_fasta_bytes(b">ab\xFFc\nACGT\n", &ReadOptions::default());
        assert!(matches!(
            result,
            Err(FastaError::Scan(ScanError::Undecodable { byte: 0xFF, line: 1 }))
        ));

        let sequences = read(">Homo é\nACGT\n").unwrap();
        assert_eq!(sequences[0].name, "Homo é");
        assert_eq!(sequences[0].species, "Homo é");
    }
}
