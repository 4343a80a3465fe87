// dedup.rs - Sequence deduplication and size filtering

use std::collections::HashMap;

use crate::data::sequence::sequence_hash;

/// A distinct sequence and every position where it occurred in the input
#[derive(Debug, Clone)]
pub struct DistinctSequence {
    /// Identifier of the first occurrence
    pub id: String,
    pub hash: String,
    pub sequence: Vec<u8>,
    /// Input positions, in input order
    pub occurrences: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct Deduplicated {
    pub distinct: Vec<DistinctSequence>,
    /// Number of inputs that repeated an earlier sequence
    pub repeated: usize,
}

/// Keep the first occurrence of each distinct sequence. Sequences are keyed
/// by their SHA-256 digest.
pub fn exclude_duplicates<'a, I>(items: I) -> Deduplicated
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut by_hash: HashMap<String, usize> = HashMap::new();
    let mut result = Deduplicated::default();

    for (position, (id, sequence)) in items.into_iter().enumerate() {
        let hash = sequence_hash(sequence);
        match by_hash.get(&hash) {
            Some(&existing) => {
                result.distinct[existing].occurrences.push(position);
                result.repeated += 1;
            }
            None => {
                by_hash.insert(hash.clone(), result.distinct.len());
                result.distinct.push(DistinctSequence {
                    id: id.to_string(),
                    hash,
                    sequence: sequence.to_vec(),
                    occurrences: vec![position],
                });
            }
        }
    }

    result
}

/// Split sequences into those that pass the minimum length and the report
/// lines for the ones that do not
pub fn exclude_small(
    sequences: Vec<DistinctSequence>,
    min_length: usize,
) -> (Vec<DistinctSequence>, Vec<String>) {
    let mut kept = Vec::with_capacity(sequences.len());
    let mut lines = Vec::new();
    for seq in sequences {
        if seq.sequence.len() < min_length {
            lines.push(format!("{}: smaller than {} chars", seq.id, min_length));
        } else {
            kept.push(seq);
        }
    }
    (kept, lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_tracked_by_first_id() {
        let items: Vec<(&str, &[u8])> = vec![
            ("g1-protein1", &b"ATGAAATAA"[..]),
            ("g2-protein1", &b"ATGCCCTAA"[..]),
            ("g2-protein2", &b"ATGAAATAA"[..]),
            ("g3-protein1", &b"ATGAAATAA"[..]),
        ];
        let result = exclude_duplicates(items);

        assert_eq!(result.distinct.len(), 2);
        assert_eq!(result.repeated, 2);
        assert_eq!(result.distinct[0].id, "g1-protein1");
        assert_eq!(result.distinct[0].occurrences, vec![0, 2, 3]);
        assert_eq!(result.distinct[1].occurrences, vec![1]);
    }

    #[test]
    fn test_exclude_small() {
        let result = exclude_duplicates(vec![("a", &b"ATGAAATAA"[..]), ("b", &b"ATGTAA"[..])]);
        let (kept, lines) = exclude_small(result.distinct, 9);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
        assert_eq!(lines, vec!["b: smaller than 9 chars".to_string()]);
    }
}
