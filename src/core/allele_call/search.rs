// search.rs - Exact and BSR based matching of CDS against schema loci

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::alignment::{blast_score_ratio, AlignmentConfig, SeedIndex};
use crate::core::bsr::{align_pairs, compute_self_scores};
use crate::core::clustering::MinimizerIndex;
use crate::core::dedup::DistinctSequence;
use crate::core::allele_call::classify::{HitKind, LocusHit};
use crate::data::schema::HashTables;
use crate::data::sequence::sequence_hash;

/// Representative allele used as BSR query
#[derive(Debug, Clone)]
pub struct Representative {
    pub locus: usize,
    /// Schema allele id, None for representatives selected in this run
    pub allele_id: Option<String>,
    pub protein: Vec<u8>,
    pub dna_length: usize,
    pub self_score: i32,
    /// Protein pool entry a new representative was taken from
    pub source: Option<usize>,
}

/// A distinct protein among the unclassified CDS and the distinct DNA
/// sequences that translate to it
#[derive(Debug, Clone)]
pub struct PoolProtein {
    pub protein: Vec<u8>,
    pub distinct: Vec<usize>,
    pub dna_length: usize,
}

/// Best BSR per locus for a pool protein
pub type LocusMatches = BTreeMap<usize, (f64, usize)>;

/// Hits for distinct DNA sequences found in the pre-computed DNA table
pub fn exact_dna_hits(
    distinct: &[DistinctSequence],
    tables: &HashTables,
    locus_index: &HashMap<&str, usize>,
) -> Vec<Vec<LocusHit>> {
    distinct
        .iter()
        .map(|seq| {
            let mut hits: Vec<LocusHit> = Vec::new();
            if let Some(entries) = tables.dna.get(&seq.hash) {
                for (locus_id, allele) in entries {
                    if let Some(&locus) = locus_index.get(locus_id.as_str()) {
                        if hits.iter().any(|h| h.locus == locus) {
                            continue;
                        }
                        hits.push(LocusHit {
                            locus,
                            kind: HitKind::ExactDna {
                                allele: allele.clone(),
                            },
                        });
                    }
                }
            }
            hits.sort_by_key(|h| h.locus);
            hits
        })
        .collect()
}

/// Loci whose schema alleles translate to the same protein
pub fn exact_protein_loci(
    protein: &[u8],
    tables: &HashTables,
    locus_index: &HashMap<&str, usize>,
) -> Vec<usize> {
    let mut loci: Vec<usize> = tables
        .protein
        .get(&sequence_hash(protein))
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(locus_id, _)| locus_index.get(locus_id.as_str()).copied())
                .collect()
        })
        .unwrap_or_default();
    loci.sort_unstable();
    loci.dedup();
    loci
}

/// Group translated distinct sequences by protein, keeping first seen order
pub fn build_pool(translated: &[(usize, Vec<u8>)], distinct: &[DistinctSequence]) -> Vec<PoolProtein> {
    let mut by_protein: HashMap<&[u8], usize> = HashMap::new();
    let mut pool: Vec<PoolProtein> = Vec::new();
    for (d, protein) in translated {
        match by_protein.get(protein.as_slice()) {
            Some(&p) => pool[p].distinct.push(*d),
            None => {
                by_protein.insert(protein.as_slice(), pool.len());
                pool.push(PoolProtein {
                    protein: protein.clone(),
                    distinct: vec![*d],
                    dna_length: distinct[*d].sequence.len(),
                });
            }
        }
    }
    pool
}

/// Align (representative, pool protein) pairs and keep, per pool protein and
/// locus, the best BSR at or above `threshold`
pub fn best_locus_matches(
    pairs: &[(usize, usize)],
    representatives: &[Representative],
    pool: &[PoolProtein],
    threshold: f64,
    config: &AlignmentConfig,
    label: &str,
) -> Result<BTreeMap<usize, LocusMatches>, String> {
    let rep_proteins: Vec<&[u8]> = representatives.iter().map(|r| r.protein.as_slice()).collect();
    let pool_proteins: Vec<&[u8]> = pool.iter().map(|p| p.protein.as_slice()).collect();
    let hits = align_pairs(pairs, &rep_proteins, &pool_proteins, config, Some(label))?;

    let mut matches: BTreeMap<usize, LocusMatches> = BTreeMap::new();
    for hit in hits {
        let rep = &representatives[hit.query];
        let bsr = blast_score_ratio(hit.score, rep.self_score);
        if bsr < threshold {
            continue;
        }
        let locus_matches = matches.entry(hit.subject).or_default();
        match locus_matches.get(&rep.locus) {
            Some((best, _)) if *best >= bsr => {}
            _ => {
                locus_matches.insert(rep.locus, (bsr, rep.dna_length));
            }
        }
    }

    Ok(matches)
}

/// Candidate pairs from shared minimizers with the representatives
pub fn minimizer_pairs(
    pending: &BTreeSet<usize>,
    pool: &[PoolProtein],
    representatives: &[Representative],
    word_size: usize,
    window_size: usize,
    clustering_sim: f64,
) -> Vec<(usize, usize)> {
    let mut index = MinimizerIndex::new(word_size, window_size);
    for (i, rep) in representatives.iter().enumerate() {
        index.insert(i, &rep.protein);
    }

    pending
        .iter()
        .flat_map(|&p| {
            index
                .matches(&pool[p].protein, clustering_sim)
                .into_iter()
                .map(move |(rep, _)| (rep, p))
        })
        .collect()
}

/// Candidate pairs from shared exact seeds with a subset of representatives
pub fn seed_pairs(
    pending: &BTreeSet<usize>,
    pool: &[PoolProtein],
    representatives: &[Representative],
    active: &[usize],
) -> Vec<(usize, usize)> {
    let index = SeedIndex::with_sequences(active.iter().map(|r| representatives[*r].protein.as_slice()));
    pending
        .iter()
        .flat_map(|&p| {
            index
                .candidates(&pool[p].protein)
                .into_iter()
                .map(move |local| (active[local], p))
        })
        .collect()
}

/// Full BSR search with iterative selection of new representatives. Pool
/// proteins matching a locus below `bsr + margin` are candidate
/// representatives; the longest candidate of each locus becomes a new
/// representative and the remaining proteins are searched against the new
/// representatives until no candidates are left.
pub fn iterative_bsr_search(
    pending: &mut BTreeSet<usize>,
    pool: &[PoolProtein],
    representatives: &mut Vec<Representative>,
    bsr: f64,
    margin: f64,
    config: &AlignmentConfig,
) -> Result<BTreeMap<usize, LocusMatches>, String> {
    let mut all_matches: BTreeMap<usize, LocusMatches> = BTreeMap::new();
    let mut active: Vec<usize> = (0..representatives.len()).collect();
    let mut iteration = 1;

    while !pending.is_empty() && !active.is_empty() {
        let pairs = seed_pairs(pending, pool, representatives, &active);
        log::debug!("BSR search iteration {}: {} pairs", iteration, pairs.len());
        let matches = best_locus_matches(
            &pairs,
            representatives,
            pool,
            bsr,
            config,
            &format!("BSR search (iteration {})", iteration),
        )?;
        if matches.is_empty() {
            break;
        }

        let mut candidates: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (p, loci) in matches {
            pending.remove(&p);
            for (locus, (value, _)) in &loci {
                if *value < bsr + margin {
                    candidates.entry(*locus).or_default().push(p);
                }
            }
            all_matches.insert(p, loci);
        }

        let selected: Vec<(usize, usize)> = candidates
            .into_iter()
            .filter_map(|(locus, proteins)| {
                proteins
                    .into_iter()
                    .max_by(|a, b| {
                        pool[*a]
                            .protein
                            .len()
                            .cmp(&pool[*b].protein.len())
                            .then(b.cmp(a))
                    })
                    .map(|p| (locus, p))
            })
            .collect();
        if selected.is_empty() {
            break;
        }

        let proteins: Vec<&[u8]> = selected.iter().map(|(_, p)| pool[*p].protein.as_slice()).collect();
        let self_scores = compute_self_scores(&proteins, config)?;
        active.clear();
        for ((locus, p), self_score) in selected.into_iter().zip(self_scores) {
            active.push(representatives.len());
            representatives.push(Representative {
                locus,
                allele_id: None,
                protein: pool[p].protein.clone(),
                dna_length: pool[p].dna_length,
                self_score,
                source: Some(p),
            });
        }
        println!(
            "   🔁 Iteration {}: {} new representative alleles",
            iteration,
            active.len()
        );
        iteration += 1;
    }

    Ok(all_matches)
}

/// Turn per protein locus matches into hits for the distinct DNA sequences
pub fn record_bsr_hits(
    matches: &BTreeMap<usize, LocusMatches>,
    pool: &[PoolProtein],
    hits: &mut [Vec<LocusHit>],
) {
    for (p, loci) in matches {
        for d in &pool[*p].distinct {
            for (locus, (bsr, representative_length)) in loci {
                hits[*d].push(LocusHit {
                    locus: *locus,
                    kind: HitKind::Bsr {
                        bsr: *bsr,
                        representative_length: *representative_length,
                    },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dedup::exclude_duplicates;
    use crate::core::translation::{translate_dna, GeneticCode};

    const PROTEIN: &[u8] = b"MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQAPILSRVGDGTQDNLSGAEKAVQVKVKALPDAQFEVVHSLAKWKRQTLGQHDFSAGEGLYTHMKALRPDEDRLSPLHSVYVDQWDWERVMGDGERQFSTLKSTVEAIWAGIKATEAAVSEEFGLAPFLPDQIHFVHSQELLSRYPDLDAKGRERAIAKDLGAVFLVGIGGKLSDGHRHDVRAPDYDDW";

    fn representative(locus: usize, protein: &[u8]) -> Representative {
        let scores = compute_self_scores(&[protein], &AlignmentConfig::default()).unwrap();
        Representative {
            locus,
            allele_id: Some("1".to_string()),
            protein: protein.to_vec(),
            dna_length: protein.len() * 3 + 3,
            self_score: scores[0],
            source: None,
        }
    }

    fn pool_entry(protein: &[u8], distinct: usize) -> PoolProtein {
        PoolProtein {
            protein: protein.to_vec(),
            distinct: vec![distinct],
            dna_length: protein.len() * 3 + 3,
        }
    }

    #[test]
    fn test_exact_hits_from_tables() {
        let code = GeneticCode::new(11).unwrap();
        let mut tables = HashTables::default();
        let dna = b"ATGAAATTTGGGTAA";
        tables
            .dna
            .insert(sequence_hash(dna), vec![("locusA".to_string(), "3".to_string())]);
        let (protein, _) = translate_dna(dna, &code, 0).unwrap();
        tables.protein.insert(
            sequence_hash(&protein),
            vec![("locusA".to_string(), "3".to_string()), ("locusA".to_string(), "4".to_string())],
        );
        let locus_index: HashMap<&str, usize> = [("locusA", 0usize)].into_iter().collect();

        let distinct = exclude_duplicates(vec![("x", &dna[..]), ("y", &b"ATGCCCTAA"[..])]).distinct;
        let hits = exact_dna_hits(&distinct, &tables, &locus_index);
        assert_eq!(hits[0].len(), 1);
        assert_eq!(hits[0][0].kind, HitKind::ExactDna { allele: "3".into() });
        assert!(hits[1].is_empty());

        assert_eq!(exact_protein_loci(&protein, &tables, &locus_index), vec![0]);
    }

    #[test]
    fn test_build_pool_groups_same_protein() {
        let distinct = exclude_duplicates(vec![
            ("a", &b"ATGAAATAA"[..]),
            ("b", &b"ATGAAGTAA"[..]),
            ("c", &b"ATGCCCTAA"[..]),
        ])
        .distinct;
        let translated = vec![(0, b"MK".to_vec()), (1, b"MK".to_vec()), (2, b"MP".to_vec())];
        let pool = build_pool(&translated, &distinct);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].distinct, vec![0, 1]);
    }

    #[test]
    fn test_minimizer_stage_finds_close_allele() {
        let reps = vec![representative(0, PROTEIN)];
        let mut variant = PROTEIN.to_vec();
        variant[50] = b'W';
        let pool = vec![pool_entry(&variant, 0), pool_entry(b"MWWPCHGNMYEFDRWCCWPNEDHGYTCWRYMPHW", 1)];
        let pending: BTreeSet<usize> = [0, 1].into_iter().collect();

        let pairs = minimizer_pairs(&pending, &pool, &reps, 5, 5, 0.2);
        assert_eq!(pairs, vec![(0, 0)]);
        let matches =
            best_locus_matches(&pairs, &reps, &pool, 0.7, &AlignmentConfig::default(), "test").unwrap();
        assert!(matches[&0][&0].0 > 0.9);

        let mut hits = vec![Vec::new(), Vec::new()];
        record_bsr_hits(&matches, &pool, &mut hits);
        assert_eq!(hits[0].len(), 1);
        assert!(hits[1].is_empty());
    }

    #[test]
    fn test_iterative_search_adds_representatives() {
        let mut reps = vec![representative(0, PROTEIN)];
        // Two thirds of the representative: BSR between 0.6 and 0.7
        let partial = &PROTEIN[..PROTEIN.len() * 2 / 3 + 4];
        let pool = vec![pool_entry(partial, 0), pool_entry(&partial[..partial.len() - 2], 1)];
        let mut pending: BTreeSet<usize> = [0, 1].into_iter().collect();

        let matches = iterative_bsr_search(
            &mut pending,
            &pool,
            &mut reps,
            0.6,
            0.1,
            &AlignmentConfig::default(),
        )
        .unwrap();

        assert!(pending.is_empty());
        assert_eq!(matches.len(), 2);
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[1].source, Some(0));
        assert_eq!(reps[1].locus, 0);
    }
}
