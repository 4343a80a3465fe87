// clustering.rs - Minimizer based clustering of protein sequences

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::minimizers::{distinct_kmers, distinct_minimizers};

/// Parameters for minimizer clustering
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringConfig {
    pub word_size: usize,
    pub window_size: usize,
    pub clustering_sim: f64,
    pub representative_filter: f64,
    pub intra_filter: f64,
}

/// Sequence assigned to a cluster with its similarity to the representative
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMember {
    pub index: usize,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub representative: usize,
    pub members: Vec<ClusterMember>,
}

impl Cluster {
    /// Representative followed by the members
    pub fn all_indices(&self) -> Vec<usize> {
        std::iter::once(self.representative)
            .chain(self.members.iter().map(|m| m.index))
            .collect()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.is_empty()
    }
}

/// Index from minimizers to the representatives that contain them
#[derive(Debug, Default)]
pub struct MinimizerIndex {
    word_size: usize,
    window_size: usize,
    index: HashMap<Vec<u8>, Vec<usize>>,
}

impl MinimizerIndex {
    pub fn new(word_size: usize, window_size: usize) -> Self {
        Self {
            word_size,
            window_size,
            index: HashMap::new(),
        }
    }

    pub fn insert(&mut self, representative: usize, sequence: &[u8]) {
        for minimizer in distinct_minimizers(sequence, self.window_size, self.word_size) {
            self.index.entry(minimizer).or_default().push(representative);
        }
    }

    /// Representatives whose share of the query's distinct minimizers is at
    /// least `min_similarity`, sorted by decreasing similarity and then by
    /// representative index
    pub fn matches(&self, sequence: &[u8], min_similarity: f64) -> Vec<(usize, f64)> {
        let minimizers = distinct_minimizers(sequence, self.window_size, self.word_size);
        if minimizers.is_empty() {
            return Vec::new();
        }

        let mut shared: HashMap<usize, usize> = HashMap::new();
        for minimizer in &minimizers {
            if let Some(reps) = self.index.get(minimizer) {
                for rep in reps {
                    *shared.entry(*rep).or_default() += 1;
                }
            }
        }

        let total = minimizers.len() as f64;
        let mut selected: Vec<(usize, f64)> = shared
            .into_iter()
            .map(|(rep, count)| (rep, count as f64 / total))
            .filter(|(_, sim)| *sim >= min_similarity)
            .collect();
        selected.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        selected
    }
}

/// Order used for clustering: decreasing length, then input order
pub fn clustering_order(sequences: &[&[u8]]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sequences.len()).collect();
    order.sort_by(|a, b| sequences[*b].len().cmp(&sequences[*a].len()).then(a.cmp(b)));
    order
}

/// Greedy clustering. Each sequence joins the most similar representative
/// or becomes a new representative.
pub fn cluster_sequences(sequences: &[&[u8]], config: &ClusteringConfig) -> Vec<Cluster> {
    let mut index = MinimizerIndex::new(config.word_size, config.window_size);
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut cluster_of: HashMap<usize, usize> = HashMap::new();

    for seq_index in clustering_order(sequences) {
        let sequence = sequences[seq_index];
        let best = index
            .matches(sequence, config.clustering_sim)
            .into_iter()
            .next();

        match best {
            Some((rep, similarity)) => {
                let cluster = cluster_of[&rep];
                clusters[cluster].members.push(ClusterMember {
                    index: seq_index,
                    similarity,
                });
            }
            None => {
                index.insert(seq_index, sequence);
                cluster_of.insert(seq_index, clusters.len());
                clusters.push(Cluster {
                    representative: seq_index,
                    members: Vec::new(),
                });
            }
        }
    }

    clusters
}

/// Remove members too similar to their representative. Returns the removed
/// sequence indices.
pub fn representative_filter(clusters: &mut [Cluster], threshold: f64) -> BTreeSet<usize> {
    let mut excluded = BTreeSet::new();
    for cluster in clusters.iter_mut() {
        cluster.members.retain(|member| {
            if member.similarity >= threshold {
                excluded.insert(member.index);
                false
            } else {
                true
            }
        });
    }
    excluded
}

/// Remove cluster members that share at least `threshold` of their distinct
/// k-mers with another member of equal or greater length. Returns the removed
/// sequence indices.
pub fn intra_cluster_filter(
    clusters: &mut [Cluster],
    sequences: &[&[u8]],
    word_size: usize,
    threshold: f64,
) -> BTreeSet<usize> {
    let mut excluded = BTreeSet::new();

    for cluster in clusters.iter_mut() {
        if cluster.members.len() < 2 {
            continue;
        }

        let mut members: Vec<usize> = cluster.members.iter().map(|m| m.index).collect();
        members.sort_by(|a, b| sequences[*b].len().cmp(&sequences[*a].len()).then(a.cmp(b)));
        let kmers: Vec<HashSet<&[u8]>> = members
            .iter()
            .map(|i| distinct_kmers(sequences[*i], word_size))
            .collect();

        let mut kept: Vec<usize> = Vec::new();
        let mut removed: HashSet<usize> = HashSet::new();
        for (pos, member) in members.iter().enumerate() {
            let own = &kmers[pos];
            let redundant = !own.is_empty()
                && kept.iter().any(|k| {
                    let shared = own.intersection(&kmers[*k]).count();
                    shared as f64 / own.len() as f64 >= threshold
                });
            if redundant {
                removed.insert(*member);
            } else {
                kept.push(pos);
            }
        }

        cluster.members.retain(|m| !removed.contains(&m.index));
        excluded.extend(removed);
    }

    excluded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClusteringConfig {
        ClusteringConfig {
            word_size: 5,
            window_size: 5,
            clustering_sim: 0.2,
            representative_filter: 0.9,
            intra_filter: 0.9,
        }
    }

    const LONG: &[u8] = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQAPILSRVGDGTQDNLSGAEKAVQVKVKALPDAQFEVVHSLAKWKRQ";
    const UNRELATED: &[u8] = b"MWWPCHGNMYEFDRWCCWPNEDHGYTCWRYMPHWCNMFGYEDRHTPCWQNMYHGF";

    #[test]
    fn test_similar_sequences_cluster_together() {
        let shorter = &LONG[..LONG.len() - 6];
        let seqs: Vec<&[u8]> = vec![shorter, LONG, UNRELATED];
        let clusters = cluster_sequences(&seqs, &config());

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].representative, 1);
        assert_eq!(clusters[0].members.len(), 1);
        assert_eq!(clusters[0].members[0].index, 0);
        assert!(clusters[0].members[0].similarity > 0.9);
        assert!(clusters[1].is_singleton());
    }

    #[test]
    fn test_representative_filter_removes_close_members() {
        let shorter = &LONG[..LONG.len() - 6];
        let seqs: Vec<&[u8]> = vec![shorter, LONG];
        let mut clusters = cluster_sequences(&seqs, &config());
        let excluded = representative_filter(&mut clusters, 0.9);

        assert!(excluded.contains(&0));
        assert!(clusters[0].is_singleton());
    }

    #[test]
    fn test_intra_cluster_filter_keeps_longest() {
        let seqs: Vec<&[u8]> = vec![&b"AAAAA"[..], LONG, &LONG[..40], &LONG[..60]];
        let mut clusters = vec![Cluster {
            representative: 0,
            members: vec![
                ClusterMember { index: 2, similarity: 0.5 },
                ClusterMember { index: 3, similarity: 0.5 },
                ClusterMember { index: 1, similarity: 0.5 },
            ],
        }];
        let excluded = intra_cluster_filter(&mut clusters, &seqs, 5, 0.9);

        assert_eq!(excluded.into_iter().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(clusters[0].all_indices(), vec![0, 1]);
    }

    #[test]
    fn test_minimizer_index_matches_sorted() {
        let mut index = MinimizerIndex::new(5, 5);
        index.insert(0, UNRELATED);
        index.insert(1, LONG);
        let matches = index.matches(&LONG[..50], 0.2);
        assert_eq!(matches[0].0, 1);
        assert!(index.matches(b"MK", 0.2).is_empty());
    }
}
