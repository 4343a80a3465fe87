// translation.rs - Genetic codes and CDS translation

use rayon::prelude::*;
use std::fmt;

/// Codon order used by the NCBI genetic code tables (T, C, A, G)
const BASES: [u8; 4] = [b'T', b'C', b'A', b'G'];

/// Supported NCBI genetic codes: (id, amino acids, start codons)
const GENETIC_CODES: [(u8, &str, &str); 4] = [
    (
        1,
        "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
        "---M---------------M---------------M----------------------------",
    ),
    (
        2,
        "FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG",
        "--------------------------------MMMM---------------M------------",
    ),
    (
        4,
        "FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
        "--MM---------------M------------MMMM---------------M------------",
    ),
    (
        11,
        "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
        "---M---------------M------------MMMM---------------M------------",
    ),
];

/// Identifiers of the genetic codes that can be used
pub fn supported_tables() -> Vec<u8> {
    GENETIC_CODES.iter().map(|(id, _, _)| *id).collect()
}

/// Strand orientation that produced a valid translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Sense,
    ReverseComplement,
}

/// Reasons for rejecting a coding sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    AmbiguousBases,
    NotMultipleOfThree,
    MissingStartCodon,
    MissingStopCodon,
    InternalStopCodon,
    TooShort(usize),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::AmbiguousBases => write!(f, "ambiguous or invalid characters"),
            TranslationError::NotMultipleOfThree => write!(f, "sequence length is not a multiple of 3"),
            TranslationError::MissingStartCodon => write!(f, "sequence does not start with a start codon"),
            TranslationError::MissingStopCodon => write!(f, "sequence does not end with a stop codon"),
            TranslationError::InternalStopCodon => write!(f, "sequence contains in frame stop codons"),
            TranslationError::TooShort(min) => write!(f, "smaller than {} chars", min),
        }
    }
}

/// A genetic code lookup table
#[derive(Debug, Clone)]
pub struct GeneticCode {
    pub id: u8,
    amino_acids: [u8; 64],
    starts: [bool; 64],
}

fn base_index(base: u8) -> Option<usize> {
    BASES.iter().position(|b| *b == base)
}

/// Index of a codon in the 64 entry tables, None for non ACGT bases
fn codon_index(codon: &[u8]) -> Option<usize> {
    let a = base_index(codon[0])?;
    let b = base_index(codon[1])?;
    let c = base_index(codon[2])?;
    Some(a * 16 + b * 4 + c)
}

impl GeneticCode {
    pub fn new(id: u8) -> Result<Self, String> {
        let (_, aas, starts) = GENETIC_CODES
            .iter()
            .find(|(code, _, _)| *code == id)
            .ok_or_else(|| {
                format!(
                    "Unsupported translation table {}. Available: {:?}",
                    id,
                    supported_tables()
                )
            })?;

        let mut amino_acids = [0u8; 64];
        amino_acids.copy_from_slice(aas.as_bytes());
        let mut start_flags = [false; 64];
        for (i, c) in starts.bytes().enumerate() {
            start_flags[i] = c == b'M';
        }

        Ok(Self {
            id,
            amino_acids,
            starts: start_flags,
        })
    }

    pub fn is_start(&self, codon: &[u8]) -> bool {
        codon_index(codon).map(|i| self.starts[i]).unwrap_or(false)
    }

    pub fn is_stop(&self, codon: &[u8]) -> bool {
        codon_index(codon)
            .map(|i| self.amino_acids[i] == b'*')
            .unwrap_or(false)
    }

    /// Translate a codon, `X` for codons with non ACGT bases
    pub fn amino_acid(&self, codon: &[u8]) -> u8 {
        codon_index(codon)
            .map(|i| self.amino_acids[i])
            .unwrap_or(b'X')
    }

    /// Translate a validated CDS. Start codons are always translated as M.
    fn translate_cds(&self, dna: &[u8]) -> Result<Vec<u8>, TranslationError> {
        if dna.len() % 3 != 0 {
            return Err(TranslationError::NotMultipleOfThree);
        }
        if dna.len() < 6 || !self.is_start(&dna[0..3]) {
            return Err(TranslationError::MissingStartCodon);
        }
        if !self.is_stop(&dna[dna.len() - 3..]) {
            return Err(TranslationError::MissingStopCodon);
        }

        let codons = dna.len() / 3;
        let mut protein = Vec::with_capacity(codons - 1);
        protein.push(b'M');
        for i in 1..codons - 1 {
            let codon = &dna[i * 3..i * 3 + 3];
            let aa = self.amino_acid(codon);
            if aa == b'*' {
                return Err(TranslationError::InternalStopCodon);
            }
            protein.push(aa);
        }

        Ok(protein)
    }
}

/// Reverse complement of a DNA sequence
pub fn reverse_complement(dna: &[u8]) -> Vec<u8> {
    dna.iter()
        .rev()
        .map(|b| match b.to_ascii_uppercase() {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            other => other,
        })
        .collect()
}

/// Translate a coding sequence, trying the sense strand first and the reverse
/// complement second. Rejects sequences shorter than `min_length` nucleotides.
pub fn translate_dna(
    dna: &[u8],
    code: &GeneticCode,
    min_length: usize,
) -> Result<(Vec<u8>, Orientation), TranslationError> {
    let upper: Vec<u8> = dna.iter().map(|b| b.to_ascii_uppercase()).collect();
    if upper.iter().any(|b| !matches!(b, b'A' | b'C' | b'G' | b'T')) {
        return Err(TranslationError::AmbiguousBases);
    }
    if upper.len() < min_length {
        return Err(TranslationError::TooShort(min_length));
    }

    match code.translate_cds(&upper) {
        Ok(protein) => Ok((protein, Orientation::Sense)),
        Err(sense_error) => {
            let reverse = reverse_complement(&upper);
            match code.translate_cds(&reverse) {
                Ok(protein) => Ok((protein, Orientation::ReverseComplement)),
                Err(_) => Err(sense_error),
            }
        }
    }
}

/// Translate a CDS and return the protein with the DNA in coding orientation
pub fn translate_coding(
    dna: &[u8],
    code: &GeneticCode,
    min_length: usize,
) -> Result<(Vec<u8>, Vec<u8>), TranslationError> {
    let (protein, orientation) = translate_dna(dna, code, min_length)?;
    let coding = match orientation {
        Orientation::Sense => dna.to_ascii_uppercase(),
        Orientation::ReverseComplement => reverse_complement(dna),
    };
    Ok((protein, coding))
}

/// Translate sequences in parallel. Results keep the input order.
pub fn translate_all(
    sequences: &[&[u8]],
    code: &GeneticCode,
    min_length: usize,
) -> Vec<Result<(Vec<u8>, Vec<u8>), TranslationError>> {
    sequences
        .par_iter()
        .map(|dna| translate_coding(dna, code, min_length))
        .collect()
}
