// minimizers.rs - k-mer and minimizer extraction for protein sequences

use std::collections::HashSet;

/// All k-mers of a sequence, in order
pub fn kmers(sequence: &[u8], k: usize) -> Vec<&[u8]> {
    if k == 0 || sequence.len() < k {
        return Vec::new();
    }
    sequence.windows(k).collect()
}

/// Distinct k-mers of a sequence
pub fn distinct_kmers(sequence: &[u8], k: usize) -> HashSet<&[u8]> {
    kmers(sequence, k).into_iter().collect()
}

/// Lexicographically smallest k-mer in each window of `window` adjacent
/// k-mers. Consecutive windows that select the same k-mer at the same
/// position only contribute once.
pub fn determine_minimizers(sequence: &[u8], window: usize, k: usize) -> Vec<&[u8]> {
    let all = kmers(sequence, k);
    if all.is_empty() {
        return Vec::new();
    }
    let window = window.max(1).min(all.len());

    let mut minimizers = Vec::new();
    let mut last_position: Option<usize> = None;
    for start in 0..=all.len() - window {
        let mut best = start;
        for pos in start + 1..start + window {
            if all[pos] < all[best] {
                best = pos;
            }
        }
        if last_position != Some(best) {
            minimizers.push(all[best]);
            last_position = Some(best);
        }
    }

    minimizers
}

/// Distinct minimizers of a sequence
pub fn distinct_minimizers(sequence: &[u8], window: usize, k: usize) -> HashSet<Vec<u8>> {
    determine_minimizers(sequence, window, k)
        .into_iter()
        .map(|m| m.to_vec())
        .collect()
}
