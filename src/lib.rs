//! # seqmatrix - FASTA to TNT conversion
//!
//! Converts per-gene FASTA collections into a single aligned TNT matrix
//! with named gene blocks, and rewrites FASTA with sanitized names.
//!
//! ## Architecture
//!
//! - `formats::scanner`: tokenizer for FASTA streams (ambiguity groups, wrapped lines)
//! - `formats::fasta`: FASTA reader and writer
//! - `formats::tnt`: matrix assembly, gap filling and TNT output
//! - `model`: sequences and per-gene metadata
//! - `alphabet`: nucleotide and protein alphabets, type classification

pub mod alphabet;
pub mod formats;
pub mod model;
