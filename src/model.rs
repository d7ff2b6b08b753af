//! Data model for sequence conversion.
//!
//! This module contains the data structures shared by the readers and writers:
//! - `Sequence`: one named sequence fragment, keyed by species and gene
//! - `GeneMetaData`: validated per-gene summary used to lay out a matrix
//!
//! Sequence data is kept as raw bytes. Ambiguity groups such as `[AG]` are
//! stored verbatim, brackets included, and count as a single position.

use std::collections::BTreeSet;

/// Gap character used for missing data.
pub const GAP: u8 = b'-';

/// Replaces spaces with underscores so a name survives whitespace-delimited formats.
pub fn safe(name: &str) -> String {
    name.replace(' ', "_")
}

/// Computes the logical length of raw sequence data.
///
/// Every ordinary character counts once; a complete `[...]` group counts once
/// no matter how many alternatives it lists.
pub fn logical_length(data: &[u8]) -> usize {
    let mut length = 0;
    let mut in_group = false;
    for &b in data {
        match b {
            b'[' => in_group = true,
            b']' => {
                if in_group {
                    length += 1;
                }
                in_group = false;
            }
            _ if in_group => {}
            _ => length += 1,
        }
    }
    length
}

/// Collects the distinct characters of `data`, leaving out the group markers.
fn observed_alphabet(data: &[u8]) -> BTreeSet<u8> {
    data.iter()
        .copied()
        .filter(|&b| b != b'[' && b != b']')
        .collect()
}

/// Represents a single sequence with its name, taxon, gene and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Display identifier (from the record header, without '>')
    pub name: String,
    /// Taxon identifier
    pub species: String,
    /// Gene (partition) the sequence belongs to
    pub gene: String,
    data: Vec<u8>,
    length: usize,
    alphabet: BTreeSet<u8>,
}

impl Sequence {
    /// Creates a new sequence. The species defaults to the name and the gene is empty.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let data = data.into();
        Self {
            species: name.clone(),
            name,
            gene: String::new(),
            length: logical_length(&data),
            alphabet: observed_alphabet(&data),
            data,
        }
    }

    /// Builds a sequence from a scanned data literal.
    ///
    /// `scanned_length` is the logical length the scanner reported for the
    /// literal; it must agree with the length derived from the bytes.
    pub(crate) fn from_scan(
        name: impl Into<String>,
        species: impl Into<String>,
        gene: impl Into<String>,
        literal: Vec<u8>,
        scanned_length: usize,
    ) -> Self {
        let mut seq = Self::new(name, literal);
        // Debug builds only: `length` is always recomputed from the literal.
        debug_assert_eq!(seq.length, scanned_length, "scanner and builder disagree on length");
        seq.species = species.into();
        seq.gene = gene.into();
        seq
    }

    /// Sets the species.
    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = species.into();
        self
    }

    /// Sets the gene.
    pub fn with_gene(mut self, gene: impl Into<String>) -> Self {
        self.gene = gene.into();
        self
    }

    /// Creates a gap-only sequence of `length` positions.
    pub fn gaps(name: impl Into<String>, length: usize) -> Self {
        Self::new(name, vec![GAP; length])
    }

    /// Replaces the data, recomputing length and alphabet.
    pub fn set_data(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
        self.length = logical_length(&self.data);
        self.alphabet = observed_alphabet(&self.data);
    }

    /// Returns the logical length of the sequence.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the sequence has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the raw sequence bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the sequence data as text.
    pub fn as_str(&self) -> &str {
        // Scanned data is ASCII; fall back to empty for foreign bytes set by hand.
        std::str::from_utf8(&self.data).unwrap_or_default()
    }

    /// Distinct characters observed in the data, without `[` and `]`.
    pub fn alphabet(&self) -> &BTreeSet<u8> {
        &self.alphabet
    }

    /// Returns the name with spaces replaced by underscores.
    pub fn safe_name(&self) -> String {
        safe(&self.name)
    }

    /// Taxon key used when assembling a matrix: the species, or the name if no species is set.
    pub fn taxon(&self) -> &str {
        if self.species.is_empty() {
            &self.name
        } else {
            &self.species
        }
    }
}

/// Validated summary of one gene across all taxa.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GeneMetaData {
    pub gene: String,
    /// Logical length shared by every non-empty sequence of the gene
    pub length: usize,
    /// Number of taxa contributing non-empty data
    pub species_count: usize,
}
