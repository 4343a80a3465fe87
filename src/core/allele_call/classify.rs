// classify.rs - Locus classes and per genome classification

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::data::sequence::CodingSequence;

/// Labels in the order used by every report
pub const CLASS_LABELS: [&str; 12] = [
    "EXC", "INF", "PLOT3", "PLOT5", "LOTSC", "NIPH", "NIPHEM", "ALM", "ASM", "PAMA", "LNF", "PLNF",
];

/// Final classification of a locus in a genome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocusClass {
    /// Exact match to a schema allele
    Exc(String),
    /// Novel allele inferred in this run
    Inf(String),
    Plot3,
    Plot5,
    Lotsc,
    Niph,
    Niphem,
    Alm,
    Asm,
    Pama,
    Lnf,
    Plnf,
}

impl LocusClass {
    pub fn label(&self) -> &'static str {
        match self {
            LocusClass::Exc(_) => "EXC",
            LocusClass::Inf(_) => "INF",
            LocusClass::Plot3 => "PLOT3",
            LocusClass::Plot5 => "PLOT5",
            LocusClass::Lotsc => "LOTSC",
            LocusClass::Niph => "NIPH",
            LocusClass::Niphem => "NIPHEM",
            LocusClass::Alm => "ALM",
            LocusClass::Asm => "ASM",
            LocusClass::Pama => "PAMA",
            LocusClass::Lnf => "LNF",
            LocusClass::Plnf => "PLNF",
        }
    }

    /// True for classes that identify an allele
    pub fn is_allele(&self) -> bool {
        matches!(self, LocusClass::Exc(_) | LocusClass::Inf(_))
    }

    pub fn allele_id(&self) -> Option<&str> {
        match self {
            LocusClass::Exc(id) | LocusClass::Inf(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for LocusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocusClass::Exc(id) => write!(f, "{}", id),
            LocusClass::Inf(id) => write!(f, "INF-{}", id),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// How a distinct CDS matched a locus
#[derive(Debug, Clone, PartialEq)]
pub enum HitKind {
    ExactDna { allele: String },
    ExactProtein,
    Bsr { bsr: f64, representative_length: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocusHit {
    pub locus: usize,
    pub kind: HitKind,
}

/// Per locus values needed to classify matches
#[derive(Debug, Clone)]
pub struct LocusContext {
    pub length_mode: Option<usize>,
    pub max_allele_id: u64,
}

#[derive(Debug, Clone)]
pub struct ClassifyParams {
    pub size_threshold: Option<f64>,
    /// Locus not found label: LNF when the full search ran, PLNF otherwise
    pub full_search: bool,
}

/// Classification before novel allele identifiers are assigned
#[derive(Debug, Clone, PartialEq)]
enum Provisional {
    Exc(String),
    Novel { distinct: usize },
    Class(LocusClass),
}

/// Classification of all loci for one genome
#[derive(Debug, Clone)]
pub struct GenomeCall {
    pub classes: Vec<LocusClass>,
    /// CDS (indices into the run's CDS list) that matched each locus
    pub matched: Vec<Vec<usize>>,
}

/// Result of classifying every genome
#[derive(Debug, Default)]
pub struct Classification {
    pub genomes: Vec<GenomeCall>,
    /// Novel alleles per locus: (allele id, distinct CDS index), in id order
    pub novel: BTreeMap<usize, Vec<(String, usize)>>,
}

/// Contig position classes for a CDS matched through its BSR with a
/// representative of `representative_length` nucleotides
pub fn position_class(
    cds: &CodingSequence,
    contig_length: usize,
    representative_length: usize,
) -> Option<LocusClass> {
    if contig_length < representative_length {
        return Some(LocusClass::Lotsc);
    }

    let length = cds.dna.len();
    if representative_length <= length {
        return None;
    }
    let missing = representative_length - length;
    let left = cds.start.saturating_sub(1);
    let right = contig_length.saturating_sub(cds.stop);
    let (five_prime, three_prime) = if cds.strand >= 0 { (left, right) } else { (right, left) };

    if five_prime < missing {
        Some(LocusClass::Plot5)
    } else if three_prime < missing {
        Some(LocusClass::Plot3)
    } else {
        None
    }
}

/// Size classes relative to the locus length mode
pub fn size_class(length: usize, length_mode: usize, threshold: f64) -> Option<LocusClass> {
    let mode = length_mode as f64;
    let length = length as f64;
    if length < mode - mode * threshold {
        Some(LocusClass::Asm)
    } else if length > mode + mode * threshold {
        Some(LocusClass::Alm)
    } else {
        None
    }
}

fn classify_single(
    cds: &CodingSequence,
    distinct: usize,
    hit: &LocusHit,
    context: &LocusContext,
    contig_lengths: Option<&HashMap<String, usize>>,
    params: &ClassifyParams,
) -> Provisional {
    match &hit.kind {
        HitKind::ExactDna { allele } => Provisional::Exc(allele.clone()),
        HitKind::ExactProtein => Provisional::Novel { distinct },
        HitKind::Bsr {
            representative_length,
            ..
        } => {
            if let Some(contig_length) = contig_lengths.and_then(|c| c.get(&cds.contig)) {
                if let Some(class) = position_class(cds, *contig_length, *representative_length) {
                    return Provisional::Class(class);
                }
            }
            if let (Some(threshold), Some(mode)) = (params.size_threshold, context.length_mode) {
                if let Some(class) = size_class(cds.dna.len(), mode, threshold) {
                    return Provisional::Class(class);
                }
            }
            Provisional::Novel { distinct }
        }
    }
}

/// Classify every locus of every genome and number the novel alleles.
///
/// `genome_cds` lists the CDS indices of each genome, `cds_distinct` maps a
/// CDS index to its distinct sequence and `hits` holds the locus hits of each
/// distinct sequence. Novel alleles get identifiers after the locus maximum,
/// in genome order and then CDS order, shared by every genome carrying them.
pub fn classify_genomes(
    genome_cds: &[Vec<usize>],
    all_cds: &[CodingSequence],
    cds_distinct: &[usize],
    hits: &[Vec<LocusHit>],
    contexts: &[LocusContext],
    contig_lengths: &[Option<HashMap<String, usize>>],
    params: &ClassifyParams,
) -> Classification {
    let missing = if params.full_search {
        LocusClass::Lnf
    } else {
        LocusClass::Plnf
    };

    let mut provisional: Vec<(Vec<Provisional>, Vec<Vec<usize>>)> = Vec::new();
    for (genome, cds_list) in genome_cds.iter().enumerate() {
        let mut matched: Vec<Vec<usize>> = vec![Vec::new(); contexts.len()];
        for &cds in cds_list {
            for hit in &hits[cds_distinct[cds]] {
                matched[hit.locus].push(cds);
            }
        }

        let calls = matched
            .iter()
            .enumerate()
            .map(|(locus, cds_matched)| match cds_matched.as_slice() {
                [] => Provisional::Class(missing.clone()),
                _ if cds_matched.iter().any(|c| hits[cds_distinct[*c]].len() > 1) => {
                    Provisional::Class(LocusClass::Pama)
                }
                [single] => {
                    let distinct = cds_distinct[*single];
                    let hit = hits[distinct]
                        .iter()
                        .find(|h| h.locus == locus)
                        .cloned()
                        .unwrap_or(LocusHit {
                            locus,
                            kind: HitKind::ExactProtein,
                        });
                    classify_single(
                        &all_cds[*single],
                        distinct,
                        &hit,
                        &contexts[locus],
                        contig_lengths[genome].as_ref(),
                        params,
                    )
                }
                several => {
                    let all_exact = several.iter().all(|c| {
                        hits[cds_distinct[*c]]
                            .iter()
                            .any(|h| h.locus == locus && matches!(h.kind, HitKind::ExactDna { .. }))
                    });
                    if all_exact {
                        Provisional::Class(LocusClass::Niphem)
                    } else {
                        Provisional::Class(LocusClass::Niph)
                    }
                }
            })
            .collect();

        provisional.push((calls, matched));
    }

    let mut next_id: Vec<u64> = contexts.iter().map(|c| c.max_allele_id + 1).collect();
    let mut assigned: HashMap<(usize, usize), String> = HashMap::new();
    let mut result = Classification::default();

    for (calls, matched) in provisional {
        let classes = calls
            .into_iter()
            .enumerate()
            .map(|(locus, call)| match call {
                Provisional::Exc(id) => LocusClass::Exc(id),
                Provisional::Class(class) => class,
                Provisional::Novel { distinct } => {
                    let id = assigned
                        .entry((locus, distinct))
                        .or_insert_with(|| {
                            let id = next_id[locus].to_string();
                            next_id[locus] += 1;
                            result
                                .novel
                                .entry(locus)
                                .or_default()
                                .push((id.clone(), distinct));
                            id
                        })
                        .clone();
                    LocusClass::Inf(id)
                }
            })
            .collect();
        result.genomes.push(GenomeCall { classes, matched });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cds(id: &str, genome: usize, start: usize, length: usize, strand: i8) -> CodingSequence {
        CodingSequence {
            id: id.to_string(),
            genome,
            contig: "c1".to_string(),
            start,
            stop: start + length - 1,
            strand,
            dna: vec![b'A'; length],
        }
    }

    fn params() -> ClassifyParams {
        ClassifyParams {
            size_threshold: Some(0.2),
            full_search: true,
        }
    }

    fn contexts(n: usize) -> Vec<LocusContext> {
        vec![
            LocusContext {
                length_mode: Some(300),
                max_allele_id: 5,
            };
            n
        ]
    }

    fn bsr_hit(locus: usize) -> LocusHit {
        LocusHit {
            locus,
            kind: HitKind::Bsr {
                bsr: 0.8,
                representative_length: 300,
            },
        }
    }

    #[test]
    fn test_class_display() {
        assert_eq!(LocusClass::Exc("3".into()).to_string(), "3");
        assert_eq!(LocusClass::Inf("7".into()).to_string(), "INF-7");
        assert_eq!(LocusClass::Niphem.to_string(), "NIPHEM");
        assert_eq!(CLASS_LABELS.len(), 12);
    }

    #[test]
    fn test_size_classes() {
        assert_eq!(size_class(200, 300, 0.2), Some(LocusClass::Asm));
        assert_eq!(size_class(400, 300, 0.2), Some(LocusClass::Alm));
        assert_eq!(size_class(300, 300, 0.2), None);
        assert_eq!(size_class(240, 300, 0.2), None);
    }

    #[test]
    fn test_position_classes() {
        let contig = 1000;
        let near_start = cds("a", 0, 1, 270, 1);
        assert_eq!(position_class(&near_start, contig, 300), Some(LocusClass::Plot5));
        let reverse_near_start = cds("b", 0, 1, 270, -1);
        assert_eq!(position_class(&reverse_near_start, contig, 300), Some(LocusClass::Plot3));
        let inner = cds("c", 0, 400, 270, 1);
        assert_eq!(position_class(&inner, contig, 300), None);
        assert_eq!(position_class(&inner, 200, 300), Some(LocusClass::Lotsc));
    }

    #[test]
    fn test_genome_classification() {
        // CDS 0: exact in locus 0, CDS 1 and 2: exact in locus 1 (NIPHEM)
        // CDS 3: BSR in loci 2 and 3 (PAMA), CDS 4: BSR in locus 4 (INF)
        let all_cds: Vec<CodingSequence> = (0..5)
            .map(|i| cds(&format!("g-protein{}", i + 1), 0, 100 + i * 1000, 300, 1))
            .collect();
        let hits = vec![
            vec![LocusHit { locus: 0, kind: HitKind::ExactDna { allele: "2".into() } }],
            vec![LocusHit { locus: 1, kind: HitKind::ExactDna { allele: "1".into() } }],
            vec![LocusHit { locus: 1, kind: HitKind::ExactDna { allele: "4".into() } }],
            vec![bsr_hit(2), bsr_hit(3)],
            vec![bsr_hit(4)],
        ];
        let result = classify_genomes(
            &[vec![0, 1, 2, 3, 4]],
            &all_cds,
            &[0, 1, 2, 3, 4],
            &hits,
            &contexts(6),
            &[None],
            &params(),
        );

        let classes = &result.genomes[0].classes;
        assert_eq!(classes[0], LocusClass::Exc("2".into()));
        assert_eq!(classes[1], LocusClass::Niphem);
        assert_eq!(classes[2], LocusClass::Pama);
        assert_eq!(classes[3], LocusClass::Pama);
        assert_eq!(classes[4], LocusClass::Inf("6".into()));
        assert_eq!(classes[5], LocusClass::Lnf);
        assert_eq!(result.novel[&4], vec![("6".to_string(), 4)]);
    }

    #[test]
    fn test_novel_ids_shared_across_genomes() {
        let all_cds = vec![
            cds("g1-protein1", 0, 100, 300, 1),
            cds("g2-protein1", 1, 100, 300, 1),
            cds("g2-protein2", 1, 900, 300, 1),
        ];
        let hits = vec![vec![bsr_hit(0)], vec![bsr_hit(0)]];
        let result = classify_genomes(
            &[vec![0], vec![1, 2]],
            &all_cds,
            &[0, 0, 1],
            &hits,
            &contexts(1),
            &[None, None],
            &ClassifyParams {
                size_threshold: None,
                full_search: false,
            },
        );

        assert_eq!(result.genomes[0].classes[0], LocusClass::Inf("6".into()));
        assert_eq!(result.genomes[1].classes[0], LocusClass::Niph);
        assert_eq!(result.novel[&0].len(), 1);
    }
}
