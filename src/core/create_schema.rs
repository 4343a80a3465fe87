// create_schema.rs - CreateSchema: build a schema seed from genomes or CDS

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use crate::core::alignment::AlignmentConfig;
use crate::core::bsr::{align_pairs, all_vs_all, apply_bsr, compute_self_scores, Hit};
use crate::core::clustering::{
    cluster_sequences, intra_cluster_filter, representative_filter, Cluster, ClusteringConfig,
};
use crate::core::constants::{
    CDS_COORDINATES_BASENAME, CLUSTERING_SIMILARITY_DEFAULT, DEFAULT_BSR,
    GENE_PREDICTION_FAILURES, INTRA_CLUSTER_DEFAULT, INVALID_CDS_BASENAME,
    MINIMUM_LENGTH_DEFAULT, OUTPUT_DIRECTORY_EXISTS, REPRESENTATIVE_FILTER_DEFAULT,
    SIZE_THRESHOLD_DEFAULT, TRANSLATION_TABLE_DEFAULT, WINDOW_SIZE_DEFAULT, WORD_SIZE_DEFAULT,
};
use crate::core::dedup::{exclude_duplicates, exclude_small};
use crate::core::prediction::{collect_cds, PredictionMode};
use crate::core::translation::{translate_all, GeneticCode};
use crate::data::schema::{locus_id_from, write_schema, LocusSeed, Schema, SchemaConfig, SelfScores};
use crate::data::sequence::{
    file_hash, resolve_input_files, unique_prefixes, write_fasta, SequenceRecord,
};
use crate::output::{write_cds_coordinates, write_lines, write_table};

#[derive(Debug, Clone)]
pub struct CreateSchemaParams {
    pub input_files: PathBuf,
    pub output_directory: PathBuf,
    pub schema_name: String,
    pub training_file: Option<PathBuf>,
    pub bsr: f64,
    pub minimum_length: usize,
    pub translation_table: u8,
    pub size_threshold: Option<f64>,
    pub word_size: usize,
    pub window_size: usize,
    pub clustering_sim: f64,
    pub representative_filter: f64,
    pub intra_filter: f64,
    pub prediction_mode: PredictionMode,
    pub cds_input: bool,
    pub no_cleanup: bool,
}

impl Default for CreateSchemaParams {
    fn default() -> Self {
        Self {
            input_files: PathBuf::new(),
            output_directory: PathBuf::new(),
            schema_name: "schema_seed".to_string(),
            training_file: None,
            bsr: DEFAULT_BSR,
            minimum_length: MINIMUM_LENGTH_DEFAULT,
            translation_table: TRANSLATION_TABLE_DEFAULT,
            size_threshold: Some(SIZE_THRESHOLD_DEFAULT),
            word_size: WORD_SIZE_DEFAULT,
            window_size: WINDOW_SIZE_DEFAULT,
            clustering_sim: CLUSTERING_SIMILARITY_DEFAULT,
            representative_filter: REPRESENTATIVE_FILTER_DEFAULT,
            intra_filter: INTRA_CLUSTER_DEFAULT,
            prediction_mode: PredictionMode::Single,
            cds_input: false,
            no_cleanup: false,
        }
    }
}

impl CreateSchemaParams {
    fn clustering_config(&self) -> ClusteringConfig {
        ClusteringConfig {
            word_size: self.word_size,
            window_size: self.window_size,
            clustering_sim: self.clustering_sim,
            representative_filter: self.representative_filter,
            intra_filter: self.intra_filter,
        }
    }

    fn schema_config(&self, training_hash: Option<String>) -> SchemaConfig {
        SchemaConfig {
            bsr: self.bsr,
            prodigal_training_file: training_hash,
            translation_table: self.translation_table,
            minimum_locus_length: self.minimum_length,
            chewbbaca_version: env!("CARGO_PKG_VERSION").to_string(),
            size_threshold: self.size_threshold,
            word_size: self.word_size,
            window_size: self.window_size,
            cluster_sim: self.clustering_sim,
            representative_filter: self.representative_filter,
            intra_cluster_filter: self.intra_filter,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateSchemaSummary {
    pub schema_directory: PathBuf,
    pub inputs: usize,
    pub failed: usize,
    pub loci: usize,
}

/// A distinct protein with the CDS it was first seen in
struct Candidate {
    id: String,
    dna: Vec<u8>,
    protein: Vec<u8>,
}

/// All ordered pairs among the members of non singleton clusters
fn cluster_pairs(clusters: &[Cluster]) -> Vec<(usize, usize)> {
    clusters
        .iter()
        .filter(|c| !c.is_singleton())
        .flat_map(|cluster| {
            let members = cluster.all_indices();
            let mut pairs = Vec::with_capacity(members.len() * (members.len() - 1));
            for &q in &members {
                for &s in &members {
                    if q != s {
                        pairs.push((q, s));
                    }
                }
            }
            pairs
        })
        .collect()
}

/// Reduce a set of proteins to the loci of a new schema. Returns the indices
/// of the proteins that become loci.
pub fn select_loci(
    proteins: &[&[u8]],
    self_scores: &[i32],
    params: &CreateSchemaParams,
    align_config: &AlignmentConfig,
) -> Result<Vec<usize>, String> {
    let lengths: Vec<usize> = proteins.iter().map(|p| p.len()).collect();
    let clustering = params.clustering_config();

    let mut clusters = cluster_sequences(proteins, &clustering);
    let multi = clusters.iter().filter(|c| !c.is_singleton()).count();
    println!("🔗 {} clusters ({} with more than one sequence)", clusters.len(), multi);

    let mut excluded = representative_filter(&mut clusters, clustering.representative_filter);
    println!(
        "   Removed {} sequences with similarity >= {} to their representative",
        excluded.len(),
        clustering.representative_filter
    );
    let intra = intra_cluster_filter(&mut clusters, proteins, clustering.word_size, clustering.intra_filter);
    println!(
        "   Removed {} sequences sharing >= {} of their k-mers within clusters",
        intra.len(),
        clustering.intra_filter
    );
    excluded.extend(intra);

    // Members of a cluster are only aligned among themselves, so one pass of
    // the exclusion rule over all clusters is the same as one per cluster
    let pairs = cluster_pairs(&clusters);
    let hits: Vec<Hit> = align_pairs(&pairs, proteins, proteins, align_config, Some("cluster alignments"))?;
    let cluster_excluded = apply_bsr(&hits, self_scores, &lengths, params.bsr);
    println!("   Removed {} sequences based on intra-cluster BSR", cluster_excluded.len());
    excluded.extend(cluster_excluded);

    let remaining: Vec<usize> = (0..proteins.len()).filter(|i| !excluded.contains(i)).collect();
    let remaining_proteins: Vec<&[u8]> = remaining.iter().map(|i| proteins[*i]).collect();
    let remaining_scores: Vec<i32> = remaining.iter().map(|i| self_scores[*i]).collect();
    let remaining_lengths: Vec<usize> = remaining.iter().map(|i| lengths[*i]).collect();
    let hits = all_vs_all(&remaining_proteins, align_config, true, Some("final BSR"))?;
    let final_excluded: BTreeSet<usize> =
        apply_bsr(&hits, &remaining_scores, &remaining_lengths, params.bsr);
    println!("   Removed {} sequences in the final BSR comparison", final_excluded.len());

    Ok(remaining
        .into_iter()
        .enumerate()
        .filter(|(local, _)| !final_excluded.contains(local))
        .map(|(_, global)| global)
        .collect())
}

/// Create a schema seed from the input genomes
pub fn run(params: &CreateSchemaParams) -> Result<CreateSchemaSummary, String> {
    let files = resolve_input_files(&params.input_files)?;
    let prefixes = unique_prefixes(&files)?;
    if params.output_directory.exists() {
        return Err(OUTPUT_DIRECTORY_EXISTS.to_string());
    }
    let temp = params.output_directory.join("temp");
    fs::create_dir_all(&temp)
        .map_err(|e| format!("Failed to create {}: {}", temp.display(), e))?;
    let training_hash = match &params.training_file {
        Some(path) => Some(file_hash(path)?),
        None => None,
    };

    let code = GeneticCode::new(params.translation_table)?;
    let align_config = AlignmentConfig::default();
    println!("🧬 Number of inputs: {}", files.len());
    if params.training_file.is_some() && params.prediction_mode == PredictionMode::Meta {
        println!("⚠️  Training file is ignored in meta mode");
    }

    // Coding sequences
    let action = if params.cds_input { "Reading CDS" } else { "Predicting genes" };
    println!("🔍 {} for {} inputs...", action, files.len());
    let (genomes, failures) =
        collect_cds(&files, &prefixes, &code, params.prediction_mode, params.cds_input);
    if !failures.is_empty() {
        println!("⚠️  Failed to predict genes for {} inputs", failures.len());
        let rows: Vec<Vec<String>> = failures.iter().map(|(g, r)| vec![g.clone(), r.clone()]).collect();
        write_table(
            &params.output_directory.join(GENE_PREDICTION_FAILURES),
            &["Genome".to_string(), "Reason".to_string()],
            &rows,
        )?;
    }
    if genomes.is_empty() {
        return Err("No coding sequences available for any input".to_string());
    }
    if !params.cds_input {
        write_cds_coordinates(&params.output_directory.join(CDS_COORDINATES_BASENAME), &genomes)?;
    }

    // DNA deduplication, size filter and translation
    let all_cds: Vec<_> = genomes.iter().flat_map(|g| g.cds.iter()).collect();
    let dedup = exclude_duplicates(all_cds.iter().map(|c| (c.id.as_str(), c.dna.as_slice())));
    println!(
        "🔁 {} CDS, {} distinct ({} repeated)",
        all_cds.len(),
        dedup.distinct.len(),
        dedup.repeated
    );
    let (mut kept, small_lines) = exclude_small(dedup.distinct, params.minimum_length);
    kept.sort_by_cached_key(|s| s.id.to_lowercase());
    let sequences: Vec<&[u8]> = kept.iter().map(|s| s.sequence.as_slice()).collect();
    let translations = translate_all(&sequences, &code, params.minimum_length);

    let mut invalid_lines = Vec::new();
    let mut translated = Vec::new();
    for (seq, result) in kept.iter().zip(translations) {
        match result {
            Ok((protein, dna)) => translated.push(Candidate {
                id: seq.id.clone(),
                dna,
                protein,
            }),
            Err(e) => invalid_lines.push(format!("{}: {}", seq.id, e)),
        }
    }
    invalid_lines.extend(small_lines);
    write_lines(&params.output_directory.join(INVALID_CDS_BASENAME), &invalid_lines)?;
    println!("🧬 {} CDS translated, {} excluded", translated.len(), invalid_lines.len());

    // Protein deduplication
    let protein_dedup =
        exclude_duplicates(translated.iter().map(|c| (c.id.as_str(), c.protein.as_slice())));
    // Length ties are resolved by case-insensitive id order
    let mut candidates: Vec<&Candidate> = protein_dedup
        .distinct
        .iter()
        .map(|p| &translated[p.occurrences[0]])
        .collect();
    candidates.sort_by_cached_key(|c| c.id.to_lowercase());
    println!("🧪 {} distinct proteins", candidates.len());
    let records: Vec<SequenceRecord> = candidates
        .iter()
        .map(|c| SequenceRecord::new(c.id.clone(), c.protein.clone()))
        .collect();
    write_fasta(&temp.join("distinct_proteins.fasta"), &records)?;

    let proteins: Vec<&[u8]> = candidates.iter().map(|c| c.protein.as_slice()).collect();
    let self_scores = compute_self_scores(&proteins, &align_config)?;
    let selected = select_loci(&proteins, &self_scores, params, &align_config)?;
    if selected.is_empty() {
        return Err("No loci left after the BSR comparisons".to_string());
    }

    // Schema structure
    let schema_directory = params.output_directory.join(&params.schema_name);
    let mut scores = SelfScores::new();
    let seeds: Vec<LocusSeed> = selected
        .iter()
        .map(|&i| {
            let candidate = candidates[i];
            let locus = locus_id_from(&candidate.id);
            let record = SequenceRecord::new(format!("{}_1", locus), candidate.dna.clone());
            scores.insert(record.id.clone(), self_scores[i]);
            LocusSeed {
                id: locus,
                alleles: vec![record.clone()],
                representatives: vec![record],
            }
        })
        .collect();
    write_schema(&schema_directory, &seeds, &params.schema_config(training_hash), &scores)?;
    if let Some(path) = &params.training_file {
        if let Some(name) = path.file_name() {
            fs::copy(path, schema_directory.join(name))
                .map_err(|e| format!("Failed to copy training file {}: {}", path.display(), e))?;
        }
    }
    Schema::load(&schema_directory, None)?.hash_tables(&code)?;

    if !params.no_cleanup {
        fs::remove_dir_all(&temp)
            .map_err(|e| format!("Failed to remove {}: {}", temp.display(), e))?;
    }

    println!("✅ Created schema with {} loci in {}", seeds.len(), schema_directory.display());
    Ok(CreateSchemaSummary {
        schema_directory,
        inputs: files.len(),
        failed: failures.len(),
        loci: seeds.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::SCHEMA_CONFIG;

    const X: [&str; 8] = ["GCT", "AAA", "CTG", "GAC", "TTC", "CGT", "TGG", "CAT"];
    const Y: [&str; 8] = ["TCT", "CAA", "ATC", "GGT", "ACC", "TAT", "AAC", "GAG"];

    fn gene(codons: &[&str; 8], substitution: Option<(usize, &str)>) -> String {
        let mut body: Vec<&str> = (0..80).map(|i| codons[i % codons.len()]).collect();
        if let Some((pos, codon)) = substitution {
            body[pos] = codon;
        }
        format!("ATG{}TAA", body.concat())
    }

    fn contig(name: &str, gene: &str) -> String {
        format!(">{}\nCCCCCCCCCC{}CCCCCCCCCC\n", name, gene)
    }

    #[test]
    fn test_cluster_pairs_skip_singletons() {
        let clusters = vec![
            Cluster {
                representative: 0,
                members: vec![crate::core::clustering::ClusterMember {
                    index: 2,
                    similarity: 0.5,
                }],
            },
            Cluster {
                representative: 1,
                members: Vec::new(),
            },
        ];
        assert_eq!(cluster_pairs(&clusters), vec![(0, 2), (2, 0)]);
    }

    #[test]
    fn test_create_schema_removes_redundant_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = dir.path().join("inputs");
        fs::create_dir_all(&inputs).unwrap();
        let x = gene(&X, None);
        let y = gene(&Y, None);
        let x_variant = gene(&X, Some((10, "GAA")));
        fs::write(
            inputs.join("sampleA.fasta"),
            format!("{}{}", contig("c1", &x), contig("c2", &y)),
        )
        .unwrap();
        fs::write(inputs.join("sampleB.fasta"), contig("c1", &x)).unwrap();
        fs::write(inputs.join("sampleC.fasta"), contig("c1", &x_variant)).unwrap();

        let output = dir.path().join("out");
        let params = CreateSchemaParams {
            input_files: inputs.clone(),
            output_directory: output.clone(),
            prediction_mode: PredictionMode::Meta,
            ..Default::default()
        };
        let summary = run(&params).unwrap();
        assert_eq!(summary.inputs, 3);
        assert_eq!(summary.loci, 2);

        let schema = Schema::load(&summary.schema_directory, None).unwrap();
        let ids: Vec<&str> = schema.loci.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["sampleA-protein1", "sampleA-protein2"]);
        assert_eq!(schema.loci[0].alleles[0].id, "1");
        assert_eq!(schema.loci[0].alleles[0].sequence, x.as_bytes().to_vec());
        assert!(summary.schema_directory.join(SCHEMA_CONFIG).is_file());
        assert!(output.join(CDS_COORDINATES_BASENAME).is_file());
        assert!(!output.join("temp").exists());

        // Existing output directories are not reused
        assert_eq!(run(&params).unwrap_err(), OUTPUT_DIRECTORY_EXISTS);
    }

    #[test]
    fn test_create_schema_ties_follow_lowercase_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = dir.path().join("inputs");
        fs::create_dir_all(&inputs).unwrap();
        let mut records = vec![format!("{}A", gene(&Y, None)), gene(&X, None)];
        records.extend((3..10).map(|_| "ATGAAATAA".to_string()));
        records.push(gene(&X, Some((10, "GAA"))));
        let fasta: String = records
            .iter()
            .enumerate()
            .map(|(n, seq)| format!(">cds{}\n{}\n", n + 1, seq))
            .collect();
        fs::write(inputs.join("s.fasta"), fasta).unwrap();

        let output = dir.path().join("out");
        let params = CreateSchemaParams {
            input_files: inputs,
            output_directory: output.clone(),
            cds_input: true,
            ..Default::default()
        };
        let summary = run(&params).unwrap();

        // s-protein10 sorts before s-protein2 and represents the pair
        let schema = Schema::load(&summary.schema_directory, None).unwrap();
        let ids: Vec<&str> = schema.loci.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["s-protein10"]);
        assert!(!output.join(CDS_COORDINATES_BASENAME).exists());

        // Untranslatable CDS are listed before the small ones
        let invalid = fs::read_to_string(output.join(INVALID_CDS_BASENAME)).unwrap();
        let lines: Vec<&str> = invalid.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("s-protein1:"));
        assert!(lines[1].starts_with("s-protein3: smaller than"));
    }
}
