// bsr.rs - BLAST Score Ratio searches and redundancy exclusion

use rayon::prelude::*;
use std::collections::BTreeSet;

use crate::core::alignment::{blast_score_ratio, AlignmentConfig, ProteinAligner, SeedIndex};
use crate::output::progress_bar;

/// Alignment hit between two indexed protein sequences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub query: usize,
    pub subject: usize,
    pub score: i32,
}

/// Self alignment score for every sequence, computed in parallel
pub fn compute_self_scores(
    sequences: &[&[u8]],
    config: &AlignmentConfig,
) -> Result<Vec<i32>, String> {
    // Fail early on an invalid configuration
    ProteinAligner::new(config)?;

    sequences
        .par_iter()
        .map_init(
            || ProteinAligner::new(config),
            |aligner, sequence| match aligner {
                Ok(aligner) => aligner.self_score(sequence),
                Err(e) => Err(e.clone()),
            },
        )
        .collect()
}

/// Align a list of (query, subject) index pairs in parallel. Output order
/// follows the input order.
pub fn align_pairs(
    pairs: &[(usize, usize)],
    queries: &[&[u8]],
    subjects: &[&[u8]],
    config: &AlignmentConfig,
    label: Option<&str>,
) -> Result<Vec<Hit>, String> {
    ProteinAligner::new(config)?;

    let pb = label.map(|l| progress_bar(pairs.len() as u64, l));
    let hits: Result<Vec<Hit>, String> = pairs
        .par_iter()
        .map_init(
            || ProteinAligner::new(config),
            |aligner, &(query, subject)| {
                let aligner = aligner.as_ref().map_err(|e| e.clone())?;
                let score = aligner.score(queries[query], subjects[subject])?;
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                Ok(Hit {
                    query,
                    subject,
                    score,
                })
            },
        )
        .collect();

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    hits
}

/// All-vs-all hits among a set of sequences. With `seeded`, only pairs that
/// share exact seeds are aligned. Self hits are not computed.
pub fn all_vs_all(
    sequences: &[&[u8]],
    config: &AlignmentConfig,
    seeded: bool,
    label: Option<&str>,
) -> Result<Vec<Hit>, String> {
    let pairs: Vec<(usize, usize)> = if seeded {
        let index = SeedIndex::with_sequences(sequences.iter().copied());
        sequences
            .iter()
            .enumerate()
            .flat_map(|(q, seq)| {
                index
                    .candidates(seq)
                    .into_iter()
                    .filter(move |s| *s != q)
                    .map(move |s| (q, s))
            })
            .collect()
    } else {
        let n = sequences.len();
        (0..n)
            .flat_map(|q| (0..n).filter(move |s| *s != q).map(move |s| (q, s)))
            .collect()
    };

    log::debug!("Aligning {} candidate pairs", pairs.len());
    align_pairs(&pairs, sequences, sequences, config, label)
}

/// Select sequences to exclude based on BSR. Hits are evaluated by query
/// index and then by decreasing score. When a non excluded query hits a non
/// excluded subject with BSR >= `bsr`, the shorter of the two is excluded
/// (the subject on ties). Queries without a positive self score are excluded.
pub fn apply_bsr(hits: &[Hit], self_scores: &[i32], lengths: &[usize], bsr: f64) -> BTreeSet<usize> {
    let mut ordered: Vec<&Hit> = hits.iter().filter(|h| h.query != h.subject).collect();
    ordered.sort_by(|a, b| {
        a.query
            .cmp(&b.query)
            .then(b.score.cmp(&a.score))
            .then(a.subject.cmp(&b.subject))
    });

    let mut excluded = BTreeSet::new();
    for hit in ordered {
        if excluded.contains(&hit.query) {
            continue;
        }
        let self_score = self_scores.get(hit.query).copied().unwrap_or(0);
        if self_score <= 0 {
            excluded.insert(hit.query);
            continue;
        }

        let ratio = blast_score_ratio(hit.score, self_score);
        if ratio >= bsr && !excluded.contains(&hit.subject) {
            if lengths[hit.subject] > lengths[hit.query] {
                excluded.insert(hit.query);
            } else {
                excluded.insert(hit.subject);
            }
        }
    }

    excluded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_bsr_excludes_shorter() {
        let hits = vec![
            Hit { query: 0, subject: 0, score: 100 },
            Hit { query: 0, subject: 1, score: 90 },
            Hit { query: 1, subject: 0, score: 90 },
        ];
        let excluded = apply_bsr(&hits, &[100, 95], &[120, 110], 0.6);
        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_apply_bsr_query_shorter_than_hit() {
        let hits = vec![Hit { query: 0, subject: 1, score: 80 }];
        let excluded = apply_bsr(&hits, &[100, 120], &[100, 130], 0.6);
        assert!(excluded.contains(&0));
        assert!(!excluded.contains(&1));
    }

    #[test]
    fn test_apply_bsr_below_threshold_keeps_both() {
        let hits = vec![
            Hit { query: 0, subject: 1, score: 30 },
            Hit { query: 1, subject: 0, score: 30 },
        ];
        let excluded = apply_bsr(&hits, &[100, 100], &[100, 100], 0.6);
        assert!(excluded.is_empty());
    }

    #[test]
    fn test_apply_bsr_missing_self_score() {
        let hits = vec![Hit { query: 0, subject: 1, score: 10 }];
        let excluded = apply_bsr(&hits, &[0, 100], &[100, 100], 0.6);
        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_all_vs_all_seeded_skips_unrelated() {
        let a: &[u8] = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQ";
        let b: &[u8] = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEV";
        let c: &[u8] = b"WWWWWWWWWWWWWWWWWWWWWWWWWWWWWWW";
        let hits = all_vs_all(&[a, b, c], &AlignmentConfig::default(), true, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.query != 2 && h.subject != 2));

        let self_scores = compute_self_scores(&[a, b, c], &AlignmentConfig::default()).unwrap();
        let excluded = apply_bsr(&hits, &self_scores, &[a.len(), b.len(), c.len()], 0.6);
        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec![1]);
    }
}
