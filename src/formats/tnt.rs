//! TNT matrix writer.
//!
//! Sequences are contributed independently per gene and per taxon. The
//! matrix checks that each gene has one length, pads missing entries with
//! gaps, and writes a single non-interleaved `xread` block followed by the
//! gene block definitions.
//!
//! ## Output
//!
//! ```text
//! xread
//! 'Title'
//! 19 2
//! Homo_erectus TAGCATAGCTAATAGCTAC
//! Homo_sapiens TAGCATAGCTGATAGCTAG
//! ;
//! blocks 0 11;
//! cnames
//! [1 ATP6;
//! [2 ATP8;
//! ;
//! ```
//!
//! Genes are laid out in ascending name order. Block 0 is TNT's implicit
//! "ALL" block, so the first gene is named as block 1.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use thiserror::Error;

use crate::model::{safe, GeneMetaData, Sequence, GAP};

/// Errors that can occur while assembling a TNT matrix.
#[derive(Error, Debug)]
pub enum TntError {
    #[error("Gene '{}' has inconsistent sequence lengths:\n{}", .gene, format_lengths(.lengths))]
    InvalidSequence {
        gene: String,
        /// Taxa grouped by the non-zero length they contributed
        lengths: BTreeMap<usize, Vec<String>>,
    },

    #[error("No sequences to write")]
    EmptyMatrix,

    #[error("Failed to write matrix: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for TNT operations.
pub type TntResult<T> = Result<T, TntError>;

fn format_lengths(lengths: &BTreeMap<usize, Vec<String>>) -> String {
    lengths
        .iter()
        .map(|(length, taxa)| format!("\t{}: {}", length, taxa.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One assembled matrix row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonRow {
    /// Taxon name with spaces replaced by underscores
    pub name: String,
    /// Concatenated data of every gene, in gene order
    pub data: Vec<u8>,
}

/// Sequences indexed by gene, then by taxon.
#[derive(Debug, Clone, Default)]
pub struct TntMatrix {
    /// Matrix title, written quoted on the line after `xread`
    pub title: String,
    sequences: BTreeMap<String, BTreeMap<String, Sequence>>,
    taxa: BTreeSet<String>,
    outgroup: Option<String>,
}

impl TntMatrix {
    /// Creates an empty matrix.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Adds a sequence under its gene and taxon, replacing any earlier entry.
    pub fn add_sequence(&mut self, seq: Sequence) {
        let taxon = seq.taxon().to_string();
        let by_taxon = self.sequences.entry(seq.gene.clone()).or_default();
        if by_taxon.contains_key(&taxon) {
            log::warn!("Replacing sequence of '{}' for gene '{}'", taxon, seq.gene);
        }
        by_taxon.insert(taxon.clone(), seq);
        self.taxa.insert(taxon);
    }

    /// Adds every sequence of an iterator.
    pub fn add_sequences<I: IntoIterator<Item = Sequence>>(&mut self, seqs: I) {
        for seq in seqs {
            self.add_sequence(seq);
        }
    }

    /// Designates the taxon written first.
    ///
    /// An unknown name is accepted and simply leaves the order unchanged, so
    /// the outgroup may be set before any sequence is loaded.
    pub fn set_outgroup(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.outgroup = if name.is_empty() { None } else { Some(name) };
    }

    /// Number of distinct taxa.
    pub fn taxon_count(&self) -> usize {
        self.taxa.len()
    }

    /// Number of distinct genes.
    pub fn gene_count(&self) -> usize {
        self.sequences.len()
    }

    /// Returns the sequence stored for a gene and taxon.
    pub fn get(&self, gene: &str, taxon: &str) -> Option<&Sequence> {
        self.sequences.get(gene)?.get(taxon)
    }

    /// Validates per-gene lengths and summarizes each gene.
    ///
    /// Absent or empty entries are tolerated; they are gap-filled later.
    /// Two or more distinct non-zero lengths for one gene are an error.
    /// The result is sorted by gene name.
    pub fn generate_metadata(&self) -> TntResult<Vec<GeneMetaData>> {
        let mut metadata = Vec::with_capacity(self.sequences.len());

        for (gene, by_taxon) in &self.sequences {
            let mut lengths: BTreeMap<usize, Vec<String>> = BTreeMap::new();
            for (taxon, seq) in by_taxon {
                if seq.len() > 0 {
                    lengths.entry(seq.len()).or_default().push(taxon.clone());
                }
            }

            if lengths.len() > 1 {
                return Err(TntError::InvalidSequence {
                    gene: gene.clone(),
                    lengths,
                });
            }

            let species_count = lengths.values().map(Vec::len).sum();
            if species_count < self.taxa.len() {
                log::debug!(
                    "Gene '{}' is missing data for {} of {} taxa",
                    gene,
                    self.taxa.len() - species_count,
                    self.taxa.len()
                );
            }
            metadata.push(GeneMetaData {
                gene: gene.clone(),
                length: lengths.keys().next().copied().unwrap_or(0),
                species_count,
            });
        }

        metadata.sort();
        Ok(metadata)
    }

    /// Inserts a gap-only sequence wherever a taxon has no data for a gene.
    ///
    /// Existing non-empty data is never touched, so calling this twice is harmless.
    pub fn fill_missing(&mut self, metadata: &[GeneMetaData]) {
        for gmd in metadata {
            let by_taxon = self.sequences.entry(gmd.gene.clone()).or_default();
            for taxon in &self.taxa {
                match by_taxon.get_mut(taxon) {
                    Some(seq) if !seq.is_empty() => {}
                    Some(seq) => {
                        log::debug!("Filling empty '{}' for gene '{}' with {} gaps", taxon, gmd.gene, gmd.length);
                        seq.set_data(vec![GAP; gmd.length]);
                    }
                    None => {
                        log::debug!("Filling '{}' for gene '{}' with {} gaps", taxon, gmd.gene, gmd.length);
                        let filler = Sequence::gaps(taxon.clone(), gmd.length)
                            .with_species(taxon.clone())
                            .with_gene(gmd.gene.clone());
                        by_taxon.insert(taxon.clone(), filler);
                    }
                }
            }
        }
    }

    /// Taxa in output order: the outgroup first if it is known, then ascending.
    pub fn ordered_taxa(&self) -> Vec<&str> {
        let outgroup = self.outgroup.as_deref().map(safe);
        let first = outgroup.and_then(|og| self.taxa.iter().find(|t| safe(t) == og));

        let mut ordered = Vec::with_capacity(self.taxa.len());
        if let Some(first) = first {
            ordered.push(first.as_str());
        }
        ordered.extend(
            self.taxa
                .iter()
                .filter(|t| Some(*t) != first)
                .map(String::as_str),
        );
        ordered
    }

    /// Concatenates each taxon's data across genes in metadata order.
    ///
    /// Entries that are still missing are rendered as gaps, so rows always
    /// have the full matrix width.
    pub fn assemble_rows(&self, metadata: &[GeneMetaData]) -> Vec<TaxonRow> {
        let width = total_length(metadata);
        self.ordered_taxa()
            .into_iter()
            .map(|taxon| {
                let mut data = Vec::with_capacity(width);
                for gmd in metadata {
                    match self.get(&gmd.gene, taxon).filter(|seq| !seq.is_empty()) {
                        Some(seq) => data.extend_from_slice(seq.as_bytes()),
                        None => data.resize(data.len() + gmd.length, GAP),
                    }
                }
                TaxonRow {
                    name: safe(taxon),
                    data,
                }
            })
            .collect()
    }

    /// Writes the `xread` block.
    pub fn write_xread<W: Write>(&self, writer: &mut W, metadata: &[GeneMetaData]) -> TntResult<()> {
        let rows = self.assemble_rows(metadata);
        writeln!(writer, "xread")?;
        writeln!(writer, "'{}'", self.title)?;
        writeln!(writer, "{} {}", total_length(metadata), rows.len())?;
        for row in &rows {
            write!(writer, "{} ", row.name)?;
            writer.write_all(&row.data)?;
            writeln!(writer)?;
        }
        write!(writer, ";")?;
        Ok(())
    }

    /// Writes the block start offsets and their names.
    ///
    /// ```text
    /// blocks 0 10 18 200;
    /// cnames
    /// [1 ATP8;
    /// [2 ATP6;
    /// [3 co1;
    /// [4 dblsex;
    /// ;
    /// ```
    pub fn write_blocks<W: Write>(&self, writer: &mut W, metadata: &[GeneMetaData]) -> TntResult<()> {
        let starts: Vec<String> = block_starts(metadata).iter().map(usize::to_string).collect();
        write!(writer, "\nblocks {};\ncnames\n", starts.join(" "))?;
        for (i, gmd) in metadata.iter().enumerate() {
            writeln!(writer, "[{} {};", i + 1, gmd.gene)?;
        }
        write!(writer, ";")?;
        Ok(())
    }

    /// Renders the matrix from already validated metadata.
    ///
    /// Output is assembled in memory first so nothing reaches `writer` if
    /// rendering fails.
    pub fn render<W: Write>(&self, writer: &mut W, metadata: &[GeneMetaData]) -> TntResult<()> {
        if self.taxa.is_empty() || metadata.is_empty() {
            return Err(TntError::EmptyMatrix);
        }
        let mut buffer = Vec::new();
        self.write_xread(&mut buffer, metadata)?;
        self.write_blocks(&mut buffer, metadata)?;
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Validates, gap-fills and renders the whole matrix.
    pub fn write_matrix<W: Write>(&mut self, writer: &mut W) -> TntResult<()> {
        let metadata = self.generate_metadata()?;
        self.fill_missing(&metadata);
        self.render(writer, &metadata)
    }
}

/// Combined length of all genes, the width of every row.
pub fn total_length(metadata: &[GeneMetaData]) -> usize {
    metadata.iter().map(|gmd| gmd.length).sum()
}

/// Column offset at which each gene block starts.
pub fn block_starts(metadata: &[GeneMetaData]) -> Vec<usize> {
    metadata
        .iter()
        .scan(0, |offset, gmd| {
            let start = *offset;
            *offset += gmd.length;
            Some(start)
        })
        .collect()
}
