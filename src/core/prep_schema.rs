// prep_schema.rs - PrepExternalSchema: adapt external schemas

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::alignment::{blast_score_ratio, AlignmentConfig};
use crate::core::bsr::{align_pairs, compute_self_scores};
use crate::core::allele_call::classify::size_class;
use crate::core::constants::{
    BSR_REPRESENTATIVE_MARGIN, DEFAULT_BSR, MSL_MIN, OUTPUT_DIRECTORY_EXISTS,
    SIZE_THRESHOLD_DEFAULT, TRANSLATION_TABLE_DEFAULT,
};
use crate::core::dedup::exclude_duplicates;
use crate::core::translation::{translate_coding, GeneticCode};
use crate::data::schema::{write_schema, LocusSeed, Schema, SchemaConfig, SelfScores};
use crate::data::sequence::{file_hash, read_fasta, resolve_input_files, SequenceRecord};
use crate::output::{progress_bar, write_lines, write_table};

#[derive(Debug, Clone)]
pub struct PrepSchemaParams {
    pub input_files: PathBuf,
    pub output_directory: PathBuf,
    pub training_file: Option<PathBuf>,
    pub bsr: f64,
    pub minimum_length: usize,
    pub translation_table: u8,
    pub size_threshold: Option<f64>,
    /// Also exclude alleles shorter than the minimum length or outside the
    /// locus length mode +/- size threshold
    pub size_filter: bool,
}

impl Default for PrepSchemaParams {
    fn default() -> Self {
        Self {
            input_files: PathBuf::new(),
            output_directory: PathBuf::new(),
            training_file: None,
            bsr: DEFAULT_BSR,
            minimum_length: MSL_MIN,
            translation_table: TRANSLATION_TABLE_DEFAULT,
            size_threshold: Some(SIZE_THRESHOLD_DEFAULT),
            size_filter: false,
        }
    }
}

/// Outcome of adapting one locus
#[derive(Debug)]
pub struct AdaptedLocus {
    pub id: String,
    pub total_alleles: usize,
    /// `<locus>_<n>` records of the valid alleles
    pub alleles: Vec<SequenceRecord>,
    /// Indices into `alleles` of the representatives
    pub representatives: Vec<usize>,
    pub self_scores: Vec<i32>,
    /// `<allele id>: <reason>` for every excluded allele
    pub invalid: Vec<String>,
}

/// Most frequent length, ties to the shortest
fn length_mode(lengths: &[usize]) -> Option<usize> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for length in lengths {
        *counts.entry(*length).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(length, _)| length)
}

/// Pick representatives from the longest protein down. Proteins reaching
/// `bsr + margin` against a representative are considered represented.
pub fn select_representatives(
    proteins: &[&[u8]],
    self_scores: &[i32],
    bsr: f64,
    config: &AlignmentConfig,
) -> Result<Vec<usize>, String> {
    let mut remaining: Vec<usize> = (0..proteins.len()).collect();
    remaining.sort_by(|a, b| proteins[*b].len().cmp(&proteins[*a].len()).then(a.cmp(b)));

    let mut representatives = Vec::new();
    while !remaining.is_empty() {
        let rep = remaining.remove(0);
        representatives.push(rep);
        if remaining.is_empty() {
            break;
        }

        let pairs: Vec<(usize, usize)> = remaining.iter().map(|s| (rep, *s)).collect();
        let hits = align_pairs(&pairs, proteins, proteins, config, None)?;
        let represented: Vec<usize> = hits
            .iter()
            .filter(|h| blast_score_ratio(h.score, self_scores[rep]) >= bsr + BSR_REPRESENTATIVE_MARGIN)
            .map(|h| h.subject)
            .collect();
        remaining.retain(|p| !represented.contains(p));
    }

    representatives.sort_unstable();
    Ok(representatives)
}

/// Validate, renumber and select representatives for one locus file
pub fn adapt_locus(
    path: &Path,
    params: &PrepSchemaParams,
    code: &GeneticCode,
    config: &AlignmentConfig,
) -> Result<AdaptedLocus, String> {
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| format!("Invalid locus file name: {}", path.display()))?;
    let records = read_fasta(path)?;
    let total_alleles = records.len();
    let min_length = if params.size_filter { params.minimum_length } else { 0 };

    let mut invalid = Vec::new();
    let mut valid: Vec<(SequenceRecord, Vec<u8>)> = Vec::new();
    for record in records {
        match translate_coding(&record.sequence, code, min_length) {
            Ok((protein, dna)) => valid.push((SequenceRecord::new(record.id, dna), protein)),
            Err(e) => invalid.push(format!("{}: {}", record.id, e)),
        }
    }

    if params.size_filter {
        if let Some(threshold) = params.size_threshold {
            let lengths: Vec<usize> = valid.iter().map(|(r, _)| r.len()).collect();
            if let Some(mode) = length_mode(&lengths) {
                valid.retain(|(record, _)| match size_class(record.len(), mode, threshold) {
                    Some(class) => {
                        invalid.push(format!("{}: {} (length mode {})", record.id, class.label(), mode));
                        false
                    }
                    None => true,
                });
            }
        }
    }

    let dedup = exclude_duplicates(valid.iter().map(|(r, _)| (r.id.as_str(), r.sequence.as_slice())));
    for seq in &dedup.distinct {
        for repeated in &seq.occurrences[1..] {
            invalid.push(format!("{}: duplicate of {}", valid[*repeated].0.id, seq.id));
        }
    }
    let kept: Vec<&(SequenceRecord, Vec<u8>)> =
        dedup.distinct.iter().map(|s| &valid[s.occurrences[0]]).collect();

    let alleles: Vec<SequenceRecord> = kept
        .iter()
        .enumerate()
        .map(|(n, (record, _))| SequenceRecord::new(format!("{}_{}", id, n + 1), record.sequence.clone()))
        .collect();
    let proteins: Vec<&[u8]> = kept.iter().map(|(_, p)| p.as_slice()).collect();
    let self_scores = compute_self_scores(&proteins, config)?;
    let representatives = if proteins.is_empty() {
        Vec::new()
    } else {
        select_representatives(&proteins, &self_scores, params.bsr, config)?
    };

    Ok(AdaptedLocus {
        id,
        total_alleles,
        alleles,
        representatives,
        self_scores,
        invalid,
    })
}

/// Adapt a set of locus FASTA files into a schema
pub fn run(params: &PrepSchemaParams) -> Result<Vec<AdaptedLocus>, String> {
    if params.output_directory.exists() {
        return Err(OUTPUT_DIRECTORY_EXISTS.to_string());
    }
    let files = resolve_input_files(&params.input_files)?;
    let code = GeneticCode::new(params.translation_table)?;
    let config = AlignmentConfig::default();
    println!("🧬 Adapting {} loci...", files.len());

    let pb = progress_bar(files.len() as u64, "loci adapted");
    let adapted = files
        .par_iter()
        .map(|path| {
            let locus = adapt_locus(path, params, &code, &config);
            pb.inc(1);
            locus
        })
        .collect::<Result<Vec<_>, String>>()?;
    pb.finish_and_clear();

    let mut seeds = Vec::new();
    let mut scores = SelfScores::new();
    let mut invalid_loci = Vec::new();
    let mut invalid_alleles = Vec::new();
    let mut summary_rows = Vec::new();
    for locus in &adapted {
        invalid_alleles.extend(locus.invalid.iter().map(|line| format!("{}\t{}", locus.id, line)));
        summary_rows.push(vec![
            locus.id.clone(),
            locus.total_alleles.to_string(),
            locus.alleles.len().to_string(),
            locus.representatives.len().to_string(),
        ]);
        if locus.alleles.is_empty() {
            invalid_loci.push(locus.id.clone());
            continue;
        }
        let representatives: Vec<SequenceRecord> = locus
            .representatives
            .iter()
            .map(|r| {
                scores.insert(locus.alleles[*r].id.clone(), locus.self_scores[*r]);
                locus.alleles[*r].clone()
            })
            .collect();
        seeds.push(LocusSeed {
            id: locus.id.clone(),
            alleles: locus.alleles.clone(),
            representatives,
        });
    }
    if seeds.is_empty() {
        return Err("No valid loci to build a schema".to_string());
    }

    let training_hash = match &params.training_file {
        Some(path) => Some(file_hash(path)?),
        None => None,
    };
    let schema_config = SchemaConfig {
        bsr: params.bsr,
        prodigal_training_file: training_hash,
        translation_table: params.translation_table,
        minimum_locus_length: params.minimum_length,
        size_threshold: params.size_threshold,
        ..Default::default()
    };
    write_schema(&params.output_directory, &seeds, &schema_config, &scores)?;
    if let Some(path) = &params.training_file {
        if let Some(name) = path.file_name() {
            fs::copy(path, params.output_directory.join(name))
                .map_err(|e| format!("Failed to copy training file {}: {}", path.display(), e))?;
        }
    }
    Schema::load(&params.output_directory, None)?.hash_tables(&code)?;

    let name = params
        .output_directory
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "schema".to_string());
    let out = &params.output_directory;
    write_table(
        &out.join(format!("{}_summary_stats.tsv", name)),
        &["Gene", "Total_alleles", "Valid_alleles", "Number_representatives"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>(),
        &summary_rows,
    )?;
    write_lines(&out.join(format!("{}_invalid_alleles.txt", name)), &invalid_alleles)?;
    write_lines(&out.join(format!("{}_invalid_loci.txt", name)), &invalid_loci)?;

    println!(
        "✅ Adapted {} loci ({} invalid) into {}",
        seeds.len(),
        invalid_loci.len(),
        out.display()
    );
    Ok(adapted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODONS: [&str; 8] = ["GCT", "AAA", "CTG", "GAC", "TTC", "CGT", "TGG", "CAT"];

    fn gene(length: usize, substitution: Option<(usize, &str)>) -> String {
        let mut body: Vec<&str> = (0..length).map(|i| CODONS[i % CODONS.len()]).collect();
        if let Some((pos, codon)) = substitution {
            body[pos] = codon;
        }
        format!("ATG{}TAA", body.concat())
    }

    #[test]
    fn test_length_mode_prefers_shortest_on_ties() {
        assert_eq!(length_mode(&[9, 12, 12, 9, 15]), Some(9));
        assert_eq!(length_mode(&[]), None);
    }

    #[test]
    fn test_adapt_locus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locusX.fasta");
        let content = format!(
            ">a1\n{}\n>a2\n{}\n>a3\nATGAAATGA\n>a4\n{}\n>a5\nATGNNNTAA\n",
            gene(80, None),
            gene(80, Some((10, "GAA"))),
            gene(80, None)
        );
        fs::write(&path, content).unwrap();

        let code = GeneticCode::new(11).unwrap();
        let locus = adapt_locus(&path, &PrepSchemaParams::default(), &code, &AlignmentConfig::default()).unwrap();
        assert_eq!(locus.id, "locusX");
        assert_eq!(locus.total_alleles, 5);
        let ids: Vec<&str> = locus.alleles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["locusX_1", "locusX_2", "locusX_3"]);
        // a2 is represented by a1, the short a3 is not
        assert_eq!(locus.representatives, vec![0, 2]);
        assert_eq!(locus.invalid.len(), 2);
        assert!(locus.invalid.iter().any(|l| l.starts_with("a4: duplicate of a1")));
    }

    #[test]
    fn test_size_filter_removes_outliers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locusY.fasta");
        let content = format!(
            ">b1\n{}\n>b2\n{}\n>b3\n{}\n",
            gene(80, None),
            gene(80, Some((5, "GAA"))),
            gene(40, None)
        );
        fs::write(&path, content).unwrap();

        let params = PrepSchemaParams {
            size_filter: true,
            ..Default::default()
        };
        let code = GeneticCode::new(11).unwrap();
        let locus = adapt_locus(&path, &params, &code, &AlignmentConfig::default()).unwrap();
        assert_eq!(locus.alleles.len(), 2);
        assert!(locus.invalid[0].starts_with("b3: ASM"));
    }

    #[test]
    fn test_run_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = dir.path().join("external");
        fs::create_dir_all(&inputs).unwrap();
        fs::write(inputs.join("l1.fasta"), format!(">x\n{}\n", gene(80, None))).unwrap();
        fs::write(inputs.join("l2.fasta"), ">y\nATGNNNTAA\n").unwrap();

        let params = PrepSchemaParams {
            input_files: inputs,
            output_directory: dir.path().join("adapted"),
            ..Default::default()
        };
        run(&params).unwrap();

        let schema = Schema::load(&params.output_directory, None).unwrap();
        assert_eq!(schema.loci.len(), 1);
        assert_eq!(schema.loci[0].alleles[0].id, "1");
        let invalid_loci =
            fs::read_to_string(params.output_directory.join("adapted_invalid_loci.txt")).unwrap();
        assert_eq!(invalid_loci, "l2\n");
    }
}
