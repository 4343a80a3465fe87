// prediction.rs - Six-frame ORF based gene prediction

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::constants::{MAX_ORF_OVERLAP, MIN_ORF_LENGTH, SINGLE_MODE_MIN_LENGTH};
use crate::core::translation::{reverse_complement, GeneticCode};
use crate::data::sequence::{read_fasta, CodingSequence, SequenceRecord};
use crate::output::progress_bar;

/// Gene prediction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    /// Single genome, needs enough sequence to characterise the genome
    Single,
    /// Metagenomic or small inputs, no minimum input size
    Meta,
}

impl FromStr for PredictionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(PredictionMode::Single),
            "meta" => Ok(PredictionMode::Meta),
            _ => Err(format!("Invalid gene prediction mode: {}. Use: single, meta", s)),
        }
    }
}

impl fmt::Display for PredictionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionMode::Single => write!(f, "single"),
            PredictionMode::Meta => write!(f, "meta"),
        }
    }
}

/// Open reading frame on a contig, 0-based half open forward coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
struct Orf {
    contig: usize,
    begin: usize,
    end: usize,
    strand: i8,
}

impl Orf {
    fn len(&self) -> usize {
        self.end - self.begin
    }
}

/// ORFs of one strand. Coordinates are relative to `sequence`.
fn strand_orfs(sequence: &[u8], code: &GeneticCode) -> Vec<(usize, usize)> {
    let mut orfs = Vec::new();
    for frame in 0..3 {
        let mut start: Option<usize> = None;
        let mut pos = frame;
        while pos + 3 <= sequence.len() {
            let codon = &sequence[pos..pos + 3];
            if codon.iter().any(|b| !matches!(b, b'A' | b'C' | b'G' | b'T')) {
                start = None;
            } else if code.is_stop(codon) {
                if let Some(s) = start {
                    if pos + 3 - s >= MIN_ORF_LENGTH {
                        orfs.push((s, pos + 3));
                    }
                }
                start = None;
            } else if start.is_none() && code.is_start(codon) {
                start = Some(pos);
            }
            pos += 3;
        }
    }
    orfs
}

fn contig_orfs(contig: usize, sequence: &[u8], code: &GeneticCode) -> Vec<Orf> {
    let length = sequence.len();
    let mut orfs: Vec<Orf> = strand_orfs(sequence, code)
        .into_iter()
        .map(|(begin, end)| Orf {
            contig,
            begin,
            end,
            strand: 1,
        })
        .collect();

    let reverse = reverse_complement(sequence);
    orfs.extend(strand_orfs(&reverse, code).into_iter().map(|(begin, end)| Orf {
        contig,
        begin: length - end,
        end: length - begin,
        strand: -1,
    }));

    orfs
}

/// Accept ORFs from longest to shortest while they overlap accepted ORFs by
/// no more than the allowed overlap
fn resolve_overlaps(mut orfs: Vec<Orf>) -> Vec<Orf> {
    orfs.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then(a.contig.cmp(&b.contig))
            .then(a.begin.cmp(&b.begin))
            .then(b.strand.cmp(&a.strand))
    });

    // Accepted ORFs keyed by (contig, begin). They cannot nest, so ends grow
    // with begins and the backwards scan can stop at the first ORF that ends
    // before the candidate begins.
    let mut accepted: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    let mut selected = Vec::new();
    for orf in orfs {
        let overlapping = accepted
            .range((orf.contig, 0)..(orf.contig, orf.end))
            .rev()
            .take_while(|(_, end)| **end > orf.begin)
            .any(|((_, begin), end)| {
                let overlap = (*end).min(orf.end).saturating_sub((*begin).max(orf.begin));
                overlap > MAX_ORF_OVERLAP
            });
        if !overlapping {
            accepted.insert((orf.contig, orf.begin), orf.end);
            selected.push(orf);
        }
    }

    selected.sort_by(|a, b| a.contig.cmp(&b.contig).then(a.begin.cmp(&b.begin)));
    selected
}

/// Predict coding sequences in a genome. CDS are numbered in contig order
/// and then by position as `<prefix>-protein<N>`.
pub fn predict_genes(
    contigs: &[SequenceRecord],
    genome: usize,
    prefix: &str,
    code: &GeneticCode,
    mode: PredictionMode,
) -> Result<Vec<CodingSequence>, String> {
    let total: usize = contigs.iter().map(|c| c.len()).sum();
    if mode == PredictionMode::Single && total < SINGLE_MODE_MIN_LENGTH {
        return Err(format!(
            "sequence is {} bp long, single mode needs at least {} bp (use meta mode for small inputs)",
            total, SINGLE_MODE_MIN_LENGTH
        ));
    }

    let orfs: Vec<Orf> = contigs
        .iter()
        .enumerate()
        .flat_map(|(i, contig)| contig_orfs(i, &contig.sequence, code))
        .collect();
    let selected = resolve_overlaps(orfs);
    if selected.is_empty() {
        return Err("no coding sequences found".to_string());
    }

    let cds = selected
        .into_iter()
        .enumerate()
        .map(|(n, orf)| {
            let contig = &contigs[orf.contig];
            let forward = &contig.sequence[orf.begin..orf.end];
            let dna = if orf.strand == 1 {
                forward.to_vec()
            } else {
                reverse_complement(forward)
            };
            CodingSequence {
                id: format!("{}-protein{}", prefix, n + 1),
                genome,
                contig: contig.id.clone(),
                start: orf.begin + 1,
                stop: orf.end,
                strand: orf.strand,
                dna,
            }
        })
        .collect();

    Ok(cds)
}

/// Wrap CDS provided directly as input, numbering them as predicted CDS
pub fn cds_from_records(
    records: Vec<SequenceRecord>,
    genome: usize,
    prefix: &str,
) -> Vec<CodingSequence> {
    records
        .into_iter()
        .enumerate()
        .map(|(n, record)| {
            let length = record.sequence.len();
            CodingSequence {
                id: format!("{}-protein{}", prefix, n + 1),
                genome,
                contig: record.id,
                start: 1,
                stop: length,
                strand: 1,
                dna: record.sequence,
            }
        })
        .collect()
}

/// Coding sequences of one input genome
#[derive(Debug, Clone)]
pub struct GenomeCds {
    pub prefix: String,
    pub path: PathBuf,
    pub cds: Vec<CodingSequence>,
    /// Contig lengths, unknown when CDS were provided as input
    pub contig_lengths: Option<HashMap<String, usize>>,
}

/// Predict (or read) the CDS of every input file in parallel. Genomes that
/// fail are returned separately as (prefix, reason) and the remaining ones
/// are numbered consecutively in input order.
pub fn collect_cds(
    files: &[PathBuf],
    prefixes: &[String],
    code: &GeneticCode,
    mode: PredictionMode,
    cds_input: bool,
) -> (Vec<GenomeCds>, Vec<(String, String)>) {
    let pb: ProgressBar = progress_bar(files.len() as u64, "inputs processed");
    let results: Vec<Result<GenomeCds, String>> = files
        .par_iter()
        .zip(prefixes.par_iter())
        .map(|(path, prefix)| {
            let records = read_fasta(path)?;
            let genome = if cds_input {
                GenomeCds {
                    prefix: prefix.clone(),
                    path: path.clone(),
                    cds: cds_from_records(records, 0, prefix),
                    contig_lengths: None,
                }
            } else {
                let cds = predict_genes(&records, 0, prefix, code, mode)?;
                GenomeCds {
                    prefix: prefix.clone(),
                    path: path.clone(),
                    cds,
                    contig_lengths: Some(records.iter().map(|r| (r.id.clone(), r.len())).collect()),
                }
            };
            pb.inc(1);
            Ok(genome)
        })
        .collect();
    pb.finish_and_clear();

    let mut genomes = Vec::new();
    let mut failures = Vec::new();
    for (result, prefix) in results.into_iter().zip(prefixes) {
        match result {
            Ok(mut genome) => {
                let index = genomes.len();
                for cds in genome.cds.iter_mut() {
                    cds.genome = index;
                }
                genomes.push(genome);
            }
            Err(reason) => {
                log::warn!("Gene prediction failed for {}: {}", prefix, reason);
                failures.push((prefix.clone(), reason));
            }
        }
    }

    (genomes, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::translation::translate_dna;

    fn gene(codons: usize) -> Vec<u8> {
        let mut seq = b"ATG".to_vec();
        let pool: [&[u8]; 6] = [b"GCT", b"AAA", b"CTG", b"GAC", b"TTC", b"CGT"];
        for i in 0..codons {
            seq.extend_from_slice(pool[i % pool.len()]);
        }
        seq.extend_from_slice(b"TAA");
        seq
    }

    #[test]
    fn test_prediction_mode_parsing() {
        assert_eq!("single".parse::<PredictionMode>().unwrap(), PredictionMode::Single);
        assert_eq!("META".parse::<PredictionMode>().unwrap(), PredictionMode::Meta);
        assert!("other".parse::<PredictionMode>().is_err());
    }

    #[test]
    fn test_forward_and_reverse_genes() {
        let code = GeneticCode::new(11).unwrap();
        let forward = gene(60);
        let backward = gene(50);
        let mut contig = b"CCCCC".to_vec();
        contig.extend_from_slice(&forward);
        contig.extend_from_slice(b"CCCCCCCCCC");
        contig.extend_from_slice(&reverse_complement(&backward));
        contig.extend_from_slice(b"CCCCC");

        let contigs = vec![SequenceRecord::new("contig1", contig)];
        let cds = predict_genes(&contigs, 0, "genomeA", &code, PredictionMode::Meta).unwrap();

        let fwd = cds.iter().find(|c| c.dna == forward).unwrap();
        assert_eq!(fwd.start, 6);
        assert_eq!(fwd.stop, 5 + forward.len());
        assert_eq!(fwd.strand, 1);

        let rev = cds.iter().find(|c| c.dna == backward).unwrap();
        assert_eq!(rev.strand, -1);
        assert_eq!(rev.stop - rev.start + 1, backward.len());
        assert!(cds.iter().all(|c| c.id.starts_with("genomeA-protein")));
        assert!(cds.iter().all(|c| translate_dna(&c.dna, &code, 0).is_ok()));
    }

    #[test]
    fn test_single_mode_requires_minimum_length() {
        let code = GeneticCode::new(11).unwrap();
        let contigs = vec![SequenceRecord::new("c", gene(40))];
        assert!(predict_genes(&contigs, 0, "g", &code, PredictionMode::Single).is_err());
        assert!(predict_genes(&contigs, 0, "g", &code, PredictionMode::Meta).is_ok());
    }

    #[test]
    fn test_overlap_resolution_prefers_longest() {
        let orfs = vec![
            Orf { contig: 0, begin: 0, end: 300, strand: 1 },
            Orf { contig: 0, begin: 100, end: 250, strand: -1 },
            Orf { contig: 0, begin: 260, end: 500, strand: 1 },
            Orf { contig: 1, begin: 100, end: 250, strand: 1 },
        ];
        let selected = resolve_overlaps(orfs);
        let spans: Vec<(usize, usize, usize)> =
            selected.iter().map(|o| (o.contig, o.begin, o.end)).collect();
        assert_eq!(spans, vec![(0, 0, 300), (0, 260, 500), (1, 100, 250)]);
    }

    #[test]
    fn test_cds_input_numbering() {
        let records = vec![
            SequenceRecord::new("x", gene(40)),
            SequenceRecord::new("y", gene(41)),
        ];
        let cds = cds_from_records(records, 2, "sample");
        assert_eq!(cds[1].id, "sample-protein2");
        assert_eq!(cds[1].genome, 2);
    }

    #[test]
    fn test_collect_cds_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.fasta");
        let mut contig = b"CC".to_vec();
        contig.extend_from_slice(&gene(80));
        std::fs::write(&good, format!(">c1\n{}\n", String::from_utf8(contig).unwrap())).unwrap();
        let empty = dir.path().join("empty.fasta");
        std::fs::write(&empty, ">c1\nCCCCCCCCCCCC\n").unwrap();

        let code = GeneticCode::new(11).unwrap();
        let files = vec![empty, good];
        let prefixes = vec!["empty".to_string(), "good".to_string()];
        let (genomes, failures) = collect_cds(&files, &prefixes, &code, PredictionMode::Meta, false);

        assert_eq!(genomes.len(), 1);
        assert_eq!(genomes[0].prefix, "good");
        assert!(genomes[0].cds.iter().all(|c| c.genome == 0));
        assert_eq!(genomes[0].contig_lengths.as_ref().unwrap()["c1"], 248);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "empty");
    }
}
