//! Sequence alphabets and type classification.
//!
//! This module provides:
//! - The IUPAC nucleotide alphabet (including ambiguity codes)
//! - The amino-acid alphabet (20 residues plus `X`)
//! - A heuristic classifier that tells DNA from protein data
//!
//! Classification is advisory. It feeds diagnostics and never blocks a conversion.

use std::collections::BTreeSet;
use std::fmt;

use crate::model::{Sequence, GAP};

/// IUPAC nucleotide symbols, ambiguity codes included.
pub const NUCLEOTIDE_SYMBOLS: &[u8] = b"ACGTURYSWKMBDHVN";

/// Unambiguous bases.
pub const BASE_SYMBOLS: &[u8] = b"ACGTU";

/// The 20 standard amino acids plus `X`.
pub const PROTEIN_SYMBOLS: &[u8] = b"ACDEFGHIKLMNPQRSTVWYX";

/// Characters that carry no type information.
const NEUTRAL_SYMBOLS: &[u8] = b"-?";

/// Biological type of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceType {
    /// Only gap characters
    Blank,
    Dna,
    Protein,
    /// Neither alphabet fits cleanly
    Unsupported,
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::Blank => write!(f, "blank"),
            SequenceType::Dna => write!(f, "dna"),
            SequenceType::Protein => write!(f, "protein"),
            SequenceType::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Heuristic DNA/protein classifier.
///
/// The thresholds only decide when a diagnostic is logged for a call that
/// looks suspiciously sparse; they never change the returned type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    /// Fewer distinct amino acids than this triggers a warning on a protein call.
    pub min_protein_symbols: usize,
    /// Fewer distinct bases than this triggers a warning on a DNA call.
    pub min_nucleotide_symbols: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            min_protein_symbols: 6,
            min_nucleotide_symbols: 4,
        }
    }
}

impl Classifier {
    /// Creates a classifier with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a sequence by its observed alphabet.
    pub fn classify(&self, seq: &Sequence) -> SequenceType {
        if seq.as_bytes().iter().all(|&b| b == GAP) {
            return SequenceType::Blank;
        }

        let symbols: BTreeSet<u8> = seq
            .alphabet()
            .iter()
            .map(u8::to_ascii_uppercase)
            .filter(|b| !NEUTRAL_SYMBOLS.contains(b))
            .collect();
        if symbols.is_empty() {
            return SequenceType::Unsupported;
        }

        let in_protein = symbols.iter().all(|b| PROTEIN_SYMBOLS.contains(b));
        let in_nucleotide = symbols.iter().all(|b| NUCLEOTIDE_SYMBOLS.contains(b));
        let protein_only = symbols.iter().any(|b| !NUCLEOTIDE_SYMBOLS.contains(b));

        if in_protein && protein_only {
            let hits = count_hits(&symbols, PROTEIN_SYMBOLS);
            if hits < self.min_protein_symbols {
                log::warn!(
                    "'{}' classified as protein from only {} distinct residues",
                    seq.name,
                    hits
                );
            }
            SequenceType::Protein
        } else if in_nucleotide {
            let hits = count_hits(&symbols, BASE_SYMBOLS);
            if hits < self.min_nucleotide_symbols {
                log::warn!(
                    "'{}' classified as DNA with only {} distinct bases",
                    seq.name,
                    hits
                );
            }
            SequenceType::Dna
        } else {
            log::debug!("'{}' matches neither nucleotide nor protein alphabet", seq.name);
            SequenceType::Unsupported
        }
    }
}

fn count_hits(symbols: &BTreeSet<u8>, alphabet: &[u8]) -> usize {
    symbols.iter().filter(|b| alphabet.contains(b)).count()
}
