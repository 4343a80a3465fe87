// alignment.rs - Protein alignment configuration and scoring

use parasail_rs::{Aligner, Matrix};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::core::constants::{MIN_SHARED_SEEDS, SEED_SIZE};

/// Configuration for local protein alignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    pub matrix: String,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub description: Option<String>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            matrix: "blosum62".to_string(),
            gap_open: 11,
            gap_extend: 1,
            description: Some("BLASTp default scoring (BLOSUM62, 11/1)".to_string()),
        }
    }
}

/// Local protein aligner returning raw alignment scores
pub struct ProteinAligner {
    aligner: Aligner,
}

impl ProteinAligner {
    pub fn new(config: &AlignmentConfig) -> Result<Self, String> {
        let matrix = Matrix::from(config.matrix.as_str())
            .map_err(|e| format!("Failed to load scoring matrix '{}': {:?}", config.matrix, e))?;

        let aligner = Aligner::new()
            .matrix(matrix)
            .gap_open(config.gap_open)
            .gap_extend(config.gap_extend)
            .local()
            .build();

        Ok(Self { aligner })
    }

    /// Raw local alignment score of `subject` against `query`
    pub fn score(&self, query: &[u8], subject: &[u8]) -> Result<i32, String> {
        if query.is_empty() || subject.is_empty() {
            return Ok(0);
        }
        let result = self
            .aligner
            .align(Some(query), subject)
            .map_err(|e| format!("Alignment failed: {:?}", e))?;
        Ok(result.get_score())
    }

    /// Score of a sequence aligned against itself
    pub fn self_score(&self, sequence: &[u8]) -> Result<i32, String> {
        self.score(sequence, sequence)
    }
}

/// BLAST Score Ratio of a hit given the query self score
pub fn blast_score_ratio(score: i32, self_score: i32) -> f64 {
    if self_score <= 0 {
        return 0.0;
    }
    score as f64 / self_score as f64
}

/// Exact k-mer index used to select candidate pairs before alignment
#[derive(Debug, Default)]
pub struct SeedIndex {
    seed_size: usize,
    seeds: HashMap<Vec<u8>, Vec<usize>>,
}

impl SeedIndex {
    pub fn new(seed_size: usize) -> Self {
        Self {
            seed_size,
            seeds: HashMap::new(),
        }
    }

    /// Index built with the default seed size
    pub fn with_sequences<'a, I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut index = Self::new(SEED_SIZE);
        for (i, sequence) in sequences.into_iter().enumerate() {
            index.insert(i, sequence);
        }
        index
    }

    pub fn insert(&mut self, target: usize, sequence: &[u8]) {
        if sequence.len() < self.seed_size {
            return;
        }
        let distinct: HashSet<&[u8]> = sequence.windows(self.seed_size).collect();
        for seed in distinct {
            self.seeds.entry(seed.to_vec()).or_default().push(target);
        }
    }

    /// Indexed targets sharing at least `min_shared` distinct seeds with the
    /// query, in ascending order
    pub fn candidates_with(&self, query: &[u8], min_shared: usize) -> Vec<usize> {
        if query.len() < self.seed_size {
            return Vec::new();
        }
        let distinct: HashSet<&[u8]> = query.windows(self.seed_size).collect();
        let mut shared: HashMap<usize, usize> = HashMap::new();
        for seed in distinct {
            if let Some(targets) = self.seeds.get(seed) {
                for target in targets {
                    *shared.entry(*target).or_default() += 1;
                }
            }
        }

        let mut selected: Vec<usize> = shared
            .into_iter()
            .filter(|(_, count)| *count >= min_shared)
            .map(|(target, _)| target)
            .collect();
        selected.sort_unstable();
        selected
    }

    pub fn candidates(&self, query: &[u8]) -> Vec<usize> {
        self.candidates_with(query, MIN_SHARED_SEEDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTEIN: &[u8] = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQAPILSRVGDGTQDNLSGAEKAVQVKVKALPDAQFEVVHSLAKWKRQTLGQHDFSAGEGLYTHMKALRPDEDRLSPLHSVYVDQWDWERVMGDGERQFSTLKSTVEAIWAGIKATEAAVSEEFGLAPFLPDQIHFVHSQELLSRYPDLDAKGRERAIAKDLGAVFLVGIGGKLSDGHRHDVRAPDYDDWAITINL";

    #[test]
    fn test_default_config() {
        let config = AlignmentConfig::default();
        assert_eq!(config.matrix, "blosum62");
        assert_eq!(config.gap_open, 11);
        assert_eq!(config.gap_extend, 1);
    }

    #[test]
    fn test_self_alignment_gives_bsr_one() {
        let aligner = ProteinAligner::new(&AlignmentConfig::default()).unwrap();
        let self_score = aligner.self_score(PROTEIN).unwrap();
        assert!(self_score > 0);
        let score = aligner.score(PROTEIN, PROTEIN).unwrap();
        assert_eq!(blast_score_ratio(score, self_score), 1.0);
    }

    #[test]
    fn test_truncated_sequence_scores_lower() {
        let aligner = ProteinAligner::new(&AlignmentConfig::default()).unwrap();
        let self_score = aligner.self_score(PROTEIN).unwrap();
        let half = &PROTEIN[..PROTEIN.len() / 2];
        let score = aligner.score(PROTEIN, half).unwrap();
        let bsr = blast_score_ratio(score, self_score);
        assert!(bsr > 0.3 && bsr < 0.7);
    }

    #[test]
    fn test_bsr_without_self_score() {
        assert_eq!(blast_score_ratio(50, 0), 0.0);
    }

    #[test]
    fn test_seed_index_candidates() {
        let seqs: Vec<&[u8]> = vec![&b"MKTAYIAKQR"[..], &b"WWWWWWWWWW"[..], &b"AYIAKQRQIS"[..]];
        let index = SeedIndex::with_sequences(seqs.iter().copied());
        assert_eq!(index.candidates(b"MKTAYIAKQRQ"), vec![0, 2]);
        assert!(index.candidates(b"PPPPPPP").is_empty());
        assert!(index.candidates(b"MKT").is_empty());
    }
}
