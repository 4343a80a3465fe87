// mod.rs - AlleleCall: allelic profiles of genomes against a schema

pub mod classify;
pub mod report;
pub mod search;

// Re-export main types for convenience
pub use classify::{Classification, LocusClass, CLASS_LABELS};
pub use report::CallResults;
pub use search::Representative;

use chrono::Local;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::alignment::AlignmentConfig;
use crate::core::bsr::compute_self_scores;
use crate::core::constants::{
    ADAPT_LEGACY_SCHEMA, BSR_REPRESENTATIVE_MARGIN, CDS_COORDINATES_BASENAME,
    GENE_PREDICTION_FAILURES, INVALID_CDS_BASENAME, SCHEMA_CONFIG,
};
use crate::core::dedup::exclude_duplicates;
use crate::core::prediction::{collect_cds, PredictionMode};
use crate::core::translation::{translate_all, translate_dna, GeneticCode};
use crate::data::schema::{
    add_alleles, read_self_scores_if_present, save_self_scores, HashTables, Schema, SchemaConfig,
    SelfScores,
};
use crate::data::sequence::{
    file_hash, resolve_input_files, unique_prefixes, write_fasta, SequenceRecord,
};
use crate::hashers::HasherRegistry;
use crate::output::{write_cds_coordinates, write_run_info, write_table};
use classify::{classify_genomes, ClassifyParams, HitKind, LocusContext, LocusHit};
use search::{
    best_locus_matches, build_pool, exact_dna_hits, exact_protein_loci, iterative_bsr_search,
    minimizer_pairs, record_bsr_hits,
};

/// Options of an AlleleCall run. Unset values come from the schema config.
#[derive(Debug, Clone)]
pub struct AlleleCallParams {
    pub input_files: PathBuf,
    pub schema_directory: PathBuf,
    pub output_directory: PathBuf,
    pub training_file: Option<PathBuf>,
    pub genes_list: Option<PathBuf>,
    pub bsr: Option<f64>,
    pub minimum_length: Option<usize>,
    pub translation_table: Option<u8>,
    pub size_threshold: Option<f64>,
    pub prediction_mode: PredictionMode,
    pub cds_input: bool,
    pub no_inferred: bool,
    pub output_unclassified: bool,
    pub output_missing: bool,
    pub output_novel: bool,
    pub no_cleanup: bool,
    pub hash_profiles: Option<String>,
    pub force_continue: bool,
    /// 1 exact DNA, 2 + exact protein, 3 + minimizer candidates, 4 + full BSR search
    pub mode: u8,
}

impl Default for AlleleCallParams {
    fn default() -> Self {
        Self {
            input_files: PathBuf::new(),
            schema_directory: PathBuf::new(),
            output_directory: PathBuf::new(),
            training_file: None,
            genes_list: None,
            bsr: None,
            minimum_length: None,
            translation_table: None,
            size_threshold: None,
            prediction_mode: PredictionMode::Single,
            cds_input: false,
            no_inferred: false,
            output_unclassified: false,
            output_missing: false,
            output_novel: false,
            no_cleanup: false,
            hash_profiles: None,
            force_continue: false,
            mode: 4,
        }
    }
}

/// Differences between the provided values and the schema config
pub fn parameter_conflicts(
    config: &SchemaConfig,
    params: &AlleleCallParams,
    training_hash: Option<&str>,
) -> Vec<String> {
    let mut conflicts = Vec::new();
    if let Some(bsr) = params.bsr {
        if (bsr - config.bsr).abs() > f64::EPSILON {
            conflicts.push(format!("BLAST Score Ratio: schema {}, provided {}", config.bsr, bsr));
        }
    }
    if let Some(length) = params.minimum_length {
        if length != config.minimum_locus_length {
            conflicts.push(format!(
                "Minimum sequence length: schema {}, provided {}",
                config.minimum_locus_length, length
            ));
        }
    }
    if let Some(table) = params.translation_table {
        if table != config.translation_table {
            conflicts.push(format!(
                "Translation table: schema {}, provided {}",
                config.translation_table, table
            ));
        }
    }
    if let Some(threshold) = params.size_threshold {
        let differs = match config.size_threshold {
            Some(stored) => (stored - threshold).abs() > f64::EPSILON,
            None => true,
        };
        if differs {
            conflicts.push(format!(
                "Size threshold: schema {:?}, provided {}",
                config.size_threshold, threshold
            ));
        }
    }
    if let Some(hash) = training_hash {
        if config.prodigal_training_file.as_deref() != Some(hash) {
            conflicts.push("Training file: provided file differs from the schema's".to_string());
        }
    }
    conflicts
}

/// Schema config with the provided values applied
pub fn effective_config(
    config: &SchemaConfig,
    params: &AlleleCallParams,
    training_hash: Option<String>,
) -> SchemaConfig {
    let mut effective = config.clone();
    if let Some(bsr) = params.bsr {
        effective.bsr = bsr;
    }
    if let Some(length) = params.minimum_length {
        effective.minimum_locus_length = length;
    }
    if let Some(table) = params.translation_table {
        effective.translation_table = table;
    }
    if let Some(threshold) = params.size_threshold {
        effective.size_threshold = Some(threshold);
    }
    if training_hash.is_some() {
        effective.prodigal_training_file = training_hash;
    }
    effective
}

/// Loci ids from a genes list file, one id or path per line
pub fn read_genes_list(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read genes list {}: {}", path.display(), e))?;
    let loci: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let name = Path::new(line)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| line.to_string());
            name.trim_end_matches(".fasta").to_string()
        })
        .collect();
    if loci.is_empty() {
        return Err(format!("Genes list {} is empty", path.display()));
    }
    Ok(loci)
}

/// Output directory for a run, a timestamped subdirectory when it exists
pub fn prepare_output_directory(path: &Path) -> Result<PathBuf, String> {
    let target = if path.exists() {
        path.join(format!("results_{}", Local::now().format("%Y%m%dT%H%M%S")))
    } else {
        path.to_path_buf()
    };
    fs::create_dir_all(&target)
        .map_err(|e| format!("Failed to create output directory {}: {}", target.display(), e))?;
    Ok(target)
}

/// Load the schema config, or create a default one when forced
fn resolve_config(params: &AlleleCallParams, training_hash: Option<String>) -> Result<SchemaConfig, String> {
    let config_path = params.schema_directory.join(SCHEMA_CONFIG);
    if !config_path.is_file() {
        if !params.force_continue {
            return Err(ADAPT_LEGACY_SCHEMA.to_string());
        }
        let config = effective_config(&SchemaConfig::default(), params, training_hash);
        config.to_file(&config_path)?;
        println!("⚠️  Schema had no config file, created one with default values");
        return Ok(config);
    }

    let stored = SchemaConfig::from_file(&config_path)?;
    let conflicts = parameter_conflicts(&stored, params, training_hash.as_deref());
    if !conflicts.is_empty() {
        if !params.force_continue {
            return Err(format!(
                "Provided parameters differ from the schema config:\n  {}\nPass --force-continue to use the provided values.",
                conflicts.join("\n  ")
            ));
        }
        for conflict in &conflicts {
            println!("⚠️  {}", conflict);
        }
    }
    Ok(effective_config(&stored, params, training_hash))
}

/// Representatives of every locus with their self-scores. Missing scores
/// are computed and added to `self_scores`.
fn load_representatives(
    schema: &Schema,
    code: &GeneticCode,
    self_scores: &mut SelfScores,
    config: &AlignmentConfig,
) -> Result<Vec<Representative>, String> {
    let mut representatives = Vec::new();
    let mut keys = Vec::new();
    for (locus, l) in schema.loci.iter().enumerate() {
        for allele in &l.representatives {
            match translate_dna(&allele.sequence, code, 0) {
                Ok((protein, _)) => {
                    keys.push(l.record_id(&allele.id));
                    representatives.push(Representative {
                        locus,
                        allele_id: Some(allele.id.clone()),
                        protein,
                        dna_length: allele.sequence.len(),
                        self_score: 0,
                        source: None,
                    });
                }
                Err(e) => log::warn!("Skipping representative {}: {}", l.record_id(&allele.id), e),
            }
        }
    }

    let missing: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| !self_scores.contains_key(*key))
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        log::info!("Computing {} missing representative self-scores", missing.len());
        let proteins: Vec<&[u8]> = missing
            .iter()
            .map(|i| representatives[*i].protein.as_slice())
            .collect();
        let scores = compute_self_scores(&proteins, config)?;
        for (i, score) in missing.iter().zip(scores) {
            self_scores.insert(keys[*i].clone(), score);
        }
    }

    for (rep, key) in representatives.iter_mut().zip(&keys) {
        rep.self_score = self_scores.get(key).copied().unwrap_or(0);
    }
    Ok(representatives)
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct AlleleCallSummary {
    pub output_directory: PathBuf,
    pub genomes: usize,
    pub loci: usize,
    pub novel_alleles: usize,
    pub schema_updated: bool,
}

/// Run allele calling for every input against the schema
pub fn run(params: &AlleleCallParams) -> Result<AlleleCallSummary, String> {
    if !(1..=4).contains(&params.mode) {
        return Err(format!("Invalid mode {}. Use a value between 1 and 4", params.mode));
    }
    let hasher_registry = HasherRegistry::new();
    if let Some(name) = &params.hash_profiles {
        if !hasher_registry.has_hasher(name) {
            return Err(format!(
                "Unknown hash type: {}. Available: {}",
                name,
                hasher_registry.get_hasher_names().join(", ")
            ));
        }
    }

    Schema::validate_path(&params.schema_directory)?;
    let training_hash = match &params.training_file {
        Some(path) => Some(file_hash(path)?),
        None => None,
    };
    let config = resolve_config(params, training_hash)?;
    let code = GeneticCode::new(config.translation_table)?;
    let align_config = AlignmentConfig::default();

    let loci_filter = match &params.genes_list {
        Some(path) => Some(read_genes_list(path)?),
        None => None,
    };
    let schema = Schema::load(&params.schema_directory, loci_filter.as_deref())?;
    let files = resolve_input_files(&params.input_files)?;
    let prefixes = unique_prefixes(&files)?;
    let output = prepare_output_directory(&params.output_directory)?;
    let temp = output.join("temp");

    println!("🧬 Number of inputs: {}", files.len());
    println!("📊 Number of loci: {} ({} alleles)", schema.loci.len(), schema.total_alleles());
    println!(
        "⚙️  Mode {} | BSR {} | minimum length {} | translation table {} | size threshold {:?}",
        params.mode, config.bsr, config.minimum_locus_length, config.translation_table, config.size_threshold
    );
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
            &output.join(GENE_PREDICTION_FAILURES),
            &["Genome".to_string(), "Reason".to_string()],
            &rows,
        )?;
    }
    if genomes.is_empty() {
        return Err("No coding sequences available for any input".to_string());
    }
    if !params.cds_input {
        write_cds_coordinates(&output.join(CDS_COORDINATES_BASENAME), &genomes)?;
    }

    let mut genome_names = Vec::with_capacity(genomes.len());
    let mut genome_cds = Vec::with_capacity(genomes.len());
    let mut contig_lengths = Vec::with_capacity(genomes.len());
    let mut all_cds = Vec::new();
    for genome in genomes {
        let start = all_cds.len();
        all_cds.extend(genome.cds);
        genome_cds.push((start..all_cds.len()).collect::<Vec<usize>>());
        genome_names.push(genome.prefix);
        contig_lengths.push(genome.contig_lengths);
    }

    // Distinct DNA sequences
    let dedup = exclude_duplicates(all_cds.iter().map(|c| (c.id.as_str(), c.dna.as_slice())));
    let mut cds_distinct = vec![0usize; all_cds.len()];
    for (d, seq) in dedup.distinct.iter().enumerate() {
        for &occurrence in &seq.occurrences {
            cds_distinct[occurrence] = d;
        }
    }
    let distinct = dedup.distinct;
    println!(
        "🔁 {} CDS, {} distinct ({} repeated)",
        all_cds.len(),
        distinct.len(),
        dedup.repeated
    );

    // Exact DNA matches
    let tables = if loci_filter.is_some() {
        HashTables::build(&schema, &code)
    } else {
        schema.hash_tables(&code)?
    };
    let locus_index = schema.locus_index();
    let mut hits = exact_dna_hits(&distinct, &tables, &locus_index);
    let dna_matches = hits.iter().filter(|h| !h.is_empty()).count();
    println!("✅ {} distinct CDS are exact matches to schema alleles", dna_matches);

    // Translation
    let unmatched: Vec<usize> = (0..distinct.len()).filter(|d| hits[*d].is_empty()).collect();
    let sequences: Vec<&[u8]> = unmatched.iter().map(|d| distinct[*d].sequence.as_slice()).collect();
    let translations = translate_all(&sequences, &code, config.minimum_locus_length);
    let mut invalid_lines = Vec::new();
    let mut invalid = BTreeSet::new();
    let mut coding: HashMap<usize, Vec<u8>> = HashMap::new();
    let mut translated: Vec<(usize, Vec<u8>)> = Vec::new();
    for (&d, result) in unmatched.iter().zip(translations) {
        match result {
            Ok((protein, dna)) => {
                if dna != distinct[d].sequence {
                    coding.insert(d, dna);
                }
                translated.push((d, protein));
            }
            Err(e) => {
                invalid_lines.push(format!("{}: {}", distinct[d].id, e));
                invalid.insert(d);
            }
        }
    }
    report::write_invalid(&output, INVALID_CDS_BASENAME, &invalid_lines)?;
    println!("🧬 {} CDS translated, {} invalid", translated.len(), invalid.len());

    // Exact protein matches
    let mut remaining: Vec<(usize, Vec<u8>)> = Vec::new();
    let mut protein_matches = 0;
    for (d, protein) in translated {
        let loci = if params.mode >= 2 {
            exact_protein_loci(&protein, &tables, &locus_index)
        } else {
            Vec::new()
        };
        if loci.is_empty() {
            remaining.push((d, protein));
        } else {
            protein_matches += 1;
            hits[d].extend(loci.into_iter().map(|locus| LocusHit {
                locus,
                kind: HitKind::ExactProtein,
            }));
        }
    }
    if params.mode >= 2 {
        println!("✅ {} distinct CDS encode schema proteins", protein_matches);
    }

    // BSR based matches
    let pool = build_pool(&remaining, &distinct);
    let mut pending: BTreeSet<usize> = (0..pool.len()).collect();
    let mut self_scores = read_self_scores_if_present(&schema.path)?;
    let mut representatives = Vec::new();
    if params.mode >= 3 && !pool.is_empty() {
        fs::create_dir_all(&temp)
            .map_err(|e| format!("Failed to create {}: {}", temp.display(), e))?;
        let pool_records: Vec<SequenceRecord> = pool
            .iter()
            .enumerate()
            .map(|(p, entry)| SequenceRecord::new(format!("pool_{}", p + 1), entry.protein.clone()))
            .collect();
        write_fasta(&temp.join("unclassified_proteins.fasta"), &pool_records)?;

        representatives = load_representatives(&schema, &code, &mut self_scores, &align_config)?;
        println!(
            "🔍 Searching {} distinct proteins against {} representatives...",
            pool.len(),
            representatives.len()
        );

        let pairs = minimizer_pairs(
            &pending,
            &pool,
            &representatives,
            config.word_size,
            config.window_size,
            config.cluster_sim,
        );
        let matches = best_locus_matches(
            &pairs,
            &representatives,
            &pool,
            config.bsr + BSR_REPRESENTATIVE_MARGIN,
            &align_config,
            "minimizer candidates",
        )?;
        for p in matches.keys() {
            pending.remove(p);
        }
        println!("✅ {} distinct proteins matched through minimizer candidates", matches.len());
        record_bsr_hits(&matches, &pool, &mut hits);

        if params.mode == 4 && !pending.is_empty() {
            let matches = iterative_bsr_search(
                &mut pending,
                &pool,
                &mut representatives,
                config.bsr,
                BSR_REPRESENTATIVE_MARGIN,
                &align_config,
            )?;
            println!("✅ {} distinct proteins matched in the BSR search", matches.len());
            record_bsr_hits(&matches, &pool, &mut hits);
        }
    }

    // Classification
    let contexts: Vec<LocusContext> = schema
        .loci
        .iter()
        .map(|l| LocusContext {
            length_mode: l.length_mode(),
            max_allele_id: l.max_allele_id(),
        })
        .collect();
    let classify_params = ClassifyParams {
        size_threshold: config.size_threshold,
        full_search: params.mode == 4,
    };
    let classification = classify_genomes(
        &genome_cds,
        &all_cds,
        &cds_distinct,
        &hits,
        &contexts,
        &contig_lengths,
        &classify_params,
    );

    let results = CallResults {
        schema: &schema,
        genome_names,
        all_cds,
        genome_cds,
        cds_distinct,
        distinct,
        coding,
        hits,
        invalid,
        classification,
    };

    let novel = results.novel_records();
    let novel_count: usize = novel.values().map(|v| v.len()).sum();
    println!("🆕 {} novel alleles inferred", novel_count);

    // New representatives are kept when their sequence became a novel allele
    let novel_ids: HashMap<(usize, usize), &str> = results
        .classification
        .novel
        .iter()
        .flat_map(|(locus, alleles)| alleles.iter().map(move |(id, d)| ((*locus, *d), id.as_str())))
        .collect();
    let mut new_representatives: BTreeMap<String, Vec<SequenceRecord>> = BTreeMap::new();
    for rep in &representatives {
        let Some(p) = rep.source else { continue };
        let found = pool[p]
            .distinct
            .iter()
            .find_map(|d| novel_ids.get(&(rep.locus, *d)).map(|id| (*d, *id)));
        if let Some((d, id)) = found {
            let locus = &schema.loci[rep.locus];
            let record_id = locus.record_id(id);
            self_scores.insert(record_id.clone(), rep.self_score);
            new_representatives
                .entry(locus.id.clone())
                .or_default()
                .push(SequenceRecord::new(record_id, results.coding_dna(d)));
        }
    }

    results.write_tables(&output)?;
    if params.output_unclassified {
        results.write_unclassified(&output)?;
    }
    if params.output_missing {
        results.write_missing_classes(&output)?;
    }
    if params.output_novel {
        results.write_novel(&output)?;
    }
    if let Some(hasher) = params
        .hash_profiles
        .as_deref()
        .and_then(|name| hasher_registry.get_hasher(name))
    {
        println!("🔐 Hashing profiles with {} ({})", hasher.name(), hasher.description());
        results.write_hashed_profiles(&output, hasher)?;
    }

    // Schema update
    let schema_updated = !params.no_inferred && novel_count > 0;
    if schema_updated {
        add_alleles(&schema.path, &novel, &new_representatives)?;
        save_self_scores(&Schema::self_scores_file(&schema.path), &self_scores)?;
        Schema::load(&schema.path, None)?.hash_tables(&code)?;
        let reps: usize = new_representatives.values().map(|v| v.len()).sum();
        println!(
            "💾 Added {} novel alleles and {} representatives to the schema",
            novel_count, reps
        );
    }

    write_run_info(
        &output.join("logging_info.txt"),
        &[
            ("Schema", schema.path.display().to_string()),
            ("Number of inputs", files.len().to_string()),
            ("Number of loci", schema.loci.len().to_string()),
            ("Mode", params.mode.to_string()),
            ("BSR", config.bsr.to_string()),
            ("Minimum length", config.minimum_locus_length.to_string()),
            ("Translation table", config.translation_table.to_string()),
            ("Size threshold", format!("{:?}", config.size_threshold)),
            ("Failed gene prediction", failures.len().to_string()),
            ("Novel alleles", novel_count.to_string()),
            ("Schema updated", schema_updated.to_string()),
        ],
    )?;

    if temp.exists() && !params.no_cleanup {
        fs::remove_dir_all(&temp)
            .map_err(|e| format!("Failed to remove {}: {}", temp.display(), e))?;
    }

    println!("📁 Results available in {}", output.display());
    Ok(AlleleCallSummary {
        output_directory: output,
        genomes: results.genome_names.len(),
        loci: schema.loci.len(),
        novel_alleles: novel_count,
        schema_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{write_schema, LocusSeed};

    fn gene(codons: &[&[u8]]) -> Vec<u8> {
        let mut seq = b"ATG".to_vec();
        for codon in codons {
            seq.extend_from_slice(codon);
        }
        seq.extend_from_slice(b"TAA");
        seq
    }

    #[test]
    fn test_parameter_conflicts() {
        let config = SchemaConfig::default();
        let mut params = AlleleCallParams::default();
        assert!(parameter_conflicts(&config, &params, None).is_empty());

        params.bsr = Some(0.7);
        params.translation_table = Some(config.translation_table);
        let conflicts = parameter_conflicts(&config, &params, None);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].contains("BLAST Score Ratio"));

        let effective = effective_config(&config, &params, Some("abc".to_string()));
        assert_eq!(effective.bsr, 0.7);
        assert_eq!(effective.prodigal_training_file.as_deref(), Some("abc"));
        assert_eq!(parameter_conflicts(&config, &params, Some("abc")).len(), 2);
    }

    #[test]
    fn test_read_genes_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.txt");
        fs::write(&path, "locus1\n/some/schema/locus2.fasta\n\n").unwrap();
        assert_eq!(read_genes_list(&path).unwrap(), vec!["locus1", "locus2"]);

        fs::write(&path, "\n").unwrap();
        assert!(read_genes_list(&path).is_err());
    }

    #[test]
    fn test_output_directory_gets_timestamped_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("results");
        assert_eq!(prepare_output_directory(&fresh).unwrap(), fresh);

        let nested = prepare_output_directory(&fresh).unwrap();
        assert!(nested.starts_with(&fresh));
        assert!(nested
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("results_"));
    }

    #[test]
    fn test_missing_config_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = dir.path().join("schema");
        let allele = gene(&[&b"GCT"[..]; 40]);
        let seeds = vec![LocusSeed {
            id: "locus1".to_string(),
            alleles: vec![SequenceRecord::new("locus1_1", allele.clone())],
            representatives: vec![SequenceRecord::new("locus1_1", allele)],
        }];
        write_schema(&schema_dir, &seeds, &SchemaConfig::default(), &SelfScores::new()).unwrap();
        fs::remove_file(schema_dir.join(SCHEMA_CONFIG)).unwrap();

        let mut params = AlleleCallParams {
            schema_directory: schema_dir.clone(),
            ..Default::default()
        };
        assert_eq!(resolve_config(&params, None).unwrap_err(), ADAPT_LEGACY_SCHEMA);

        params.force_continue = true;
        params.bsr = Some(0.5);
        let config = resolve_config(&params, None).unwrap();
        assert_eq!(config.bsr, 0.5);
        assert!(schema_dir.join(SCHEMA_CONFIG).is_file());
    }

    #[test]
    fn test_allele_call_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = dir.path().join("schema");
        let codons: [&[u8]; 8] = [b"GCT", b"AAA", b"CTG", b"GAC", b"TTC", b"CGT", b"TGG", b"CAT"];
        let body: Vec<&[u8]> = (0..80).map(|i| codons[i % codons.len()]).collect();
        let known = gene(&body);
        let mut variant_body = body.clone();
        variant_body[10] = &b"GAA"[..];
        let variant = gene(&variant_body);

        let seeds = vec![LocusSeed {
            id: "locus1".to_string(),
            alleles: vec![SequenceRecord::new("locus1_1", known.clone())],
            representatives: vec![SequenceRecord::new("locus1_1", known.clone())],
        }];
        let config = SchemaConfig {
            minimum_locus_length: 0,
            ..Default::default()
        };
        write_schema(&schema_dir, &seeds, &config, &SelfScores::new()).unwrap();

        let inputs = dir.path().join("inputs");
        fs::create_dir_all(&inputs).unwrap();
        let genome = |dna: &[u8]| format!(">contig1\nCCCCCCCCCC{}CCCCCCCCCC\n", String::from_utf8(dna.to_vec()).unwrap());
        fs::write(inputs.join("sampleA.fasta"), genome(&known)).unwrap();
        fs::write(inputs.join("sampleB.fasta"), genome(&variant)).unwrap();
        fs::write(inputs.join("sampleC.fasta"), genome(&variant)).unwrap();

        let params = AlleleCallParams {
            input_files: inputs,
            schema_directory: schema_dir.clone(),
            output_directory: dir.path().join("results"),
            prediction_mode: PredictionMode::Meta,
            hash_profiles: Some("crc32".to_string()),
            ..Default::default()
        };
        let summary = run(&params).unwrap();
        assert_eq!(summary.genomes, 3);
        assert_eq!(summary.novel_alleles, 1);
        assert!(summary.schema_updated);

        let profiles = fs::read_to_string(summary.output_directory.join("results_alleles.tsv")).unwrap();
        let lines: Vec<&str> = profiles.lines().collect();
        assert_eq!(lines[0], "FILE\tlocus1");
        assert_eq!(lines[1], "sampleA\t1");
        assert_eq!(lines[2], "sampleB\tINF-2");
        assert_eq!(lines[3], "sampleC\tINF-2");
        assert!(summary.output_directory.join("results_alleles_hashed.tsv").is_file());

        let schema = Schema::load(&schema_dir, None).unwrap();
        assert_eq!(schema.loci[0].alleles.len(), 2);
        assert_eq!(schema.loci[0].alleles[1].id, "2");
        assert_eq!(schema.loci[0].alleles[1].sequence, variant);

        // A second run finds the inferred allele as an exact match
        let params = AlleleCallParams {
            output_directory: dir.path().join("results2"),
            ..params
        };
        let summary = run(&params).unwrap();
        assert_eq!(summary.novel_alleles, 0);
        let profiles = fs::read_to_string(summary.output_directory.join("results_alleles.tsv")).unwrap();
        assert!(profiles.contains("sampleB\t2"));
    }

    const X: [&[u8]; 8] = [b"GCT", b"AAA", b"CTG", b"GAC", b"TTC", b"CGT", b"TGG", b"CAT"];
    const Y: [&[u8]; 8] = [b"TCT", b"CAA", b"ATC", b"GGT", b"ACC", b"TAT", b"AAC", b"GAG"];

    fn periodic(codons: &[&'static [u8]; 8], length: usize, substitution: Option<usize>) -> Vec<u8> {
        let mut body: Vec<&[u8]> = (0..length).map(|i| codons[i % codons.len()]).collect();
        if let Some(pos) = substitution {
            body[pos] = &b"GAA"[..];
        }
        gene(&body)
    }

    /// Schema with one locus whose single allele is an 80 codon X gene
    fn single_locus_schema(dir: &Path) -> PathBuf {
        let schema_dir = dir.join("schema");
        let known = periodic(&X, 80, None);
        let seeds = vec![LocusSeed {
            id: "locus1".to_string(),
            alleles: vec![SequenceRecord::new("locus1_1", known.clone())],
            representatives: vec![SequenceRecord::new("locus1_1", known)],
        }];
        let config = SchemaConfig {
            minimum_locus_length: 0,
            ..Default::default()
        };
        write_schema(&schema_dir, &seeds, &config, &SelfScores::new()).unwrap();
        schema_dir
    }

    fn write_genomes(dir: &Path, genomes: &[(&str, Vec<u8>)], flank: usize) -> PathBuf {
        let inputs = dir.join("inputs");
        fs::create_dir_all(&inputs).unwrap();
        let padding = "C".repeat(flank);
        for (name, dna) in genomes {
            let contig = format!(
                ">contig1\n{}{}{}\n",
                padding,
                String::from_utf8(dna.clone()).unwrap(),
                padding
            );
            fs::write(inputs.join(format!("{}.fasta", name)), contig).unwrap();
        }
        inputs
    }

    fn profile_lines(output: &Path) -> Vec<String> {
        fs::read_to_string(output.join("results_alleles.tsv"))
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_no_inferred_leaves_schema_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = single_locus_schema(dir.path());
        let inputs = write_genomes(
            dir.path(),
            &[("sampleA", periodic(&X, 80, None)), ("sampleB", periodic(&X, 80, Some(10)))],
            10,
        );
        let locus_file = Schema::locus_file(&schema_dir, "locus1");
        let short_file = Schema::short_file(&schema_dir, "locus1");
        let locus_before = fs::read(&locus_file).unwrap();
        let short_before = fs::read(&short_file).unwrap();

        let params = AlleleCallParams {
            input_files: inputs,
            schema_directory: schema_dir.clone(),
            output_directory: dir.path().join("results"),
            prediction_mode: PredictionMode::Meta,
            no_inferred: true,
            ..Default::default()
        };
        let summary = run(&params).unwrap();
        assert_eq!(summary.novel_alleles, 1);
        assert!(!summary.schema_updated);

        let lines = profile_lines(&summary.output_directory);
        assert_eq!(lines[2], "sampleB\tINF-2");
        assert_eq!(fs::read(&locus_file).unwrap(), locus_before);
        assert_eq!(fs::read(&short_file).unwrap(), short_before);
        assert_eq!(Schema::load(&schema_dir, None).unwrap().loci[0].alleles.len(), 1);
    }

    #[test]
    fn test_partial_modes_report_plnf() {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = single_locus_schema(dir.path());
        let inputs = write_genomes(
            dir.path(),
            &[
                ("sampleA", periodic(&X, 80, None)),
                ("sampleB", periodic(&X, 80, Some(10))),
                ("sampleC", periodic(&Y, 80, None)),
            ],
            10,
        );

        // Exact DNA matches only
        let params = AlleleCallParams {
            input_files: inputs,
            schema_directory: schema_dir.clone(),
            output_directory: dir.path().join("mode1"),
            prediction_mode: PredictionMode::Meta,
            mode: 1,
            ..Default::default()
        };
        let summary = run(&params).unwrap();
        assert_eq!(
            profile_lines(&summary.output_directory),
            vec!["FILE\tlocus1", "sampleA\t1", "sampleB\tPLNF", "sampleC\tPLNF"]
        );
        assert!(!summary.schema_updated);

        // Minimizer candidates find the variant but not the unrelated gene
        let params = AlleleCallParams {
            output_directory: dir.path().join("mode3"),
            mode: 3,
            no_inferred: true,
            ..params
        };
        let summary = run(&params).unwrap();
        assert_eq!(
            profile_lines(&summary.output_directory),
            vec!["FILE\tlocus1", "sampleA\t1", "sampleB\tINF-2", "sampleC\tPLNF"]
        );
    }

    #[test]
    fn test_size_outliers_reach_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = single_locus_schema(dir.path());
        // Flanks longer than the missing length keep short matches away
        // from the contig tips
        let inputs = write_genomes(
            dir.path(),
            &[
                ("sampleA", periodic(&X, 80, None)),
                ("sampleB", periodic(&X, 60, None)),
                ("sampleC", periodic(&X, 104, None)),
            ],
            100,
        );

        let params = AlleleCallParams {
            input_files: inputs,
            schema_directory: schema_dir.clone(),
            output_directory: dir.path().join("results"),
            prediction_mode: PredictionMode::Meta,
            ..Default::default()
        };
        let summary = run(&params).unwrap();
        assert_eq!(
            profile_lines(&summary.output_directory),
            vec!["FILE\tlocus1", "sampleA\t1", "sampleB\tASM", "sampleC\tALM"]
        );
        assert_eq!(summary.novel_alleles, 0);
        assert!(!summary.schema_updated);
        assert!(summary.output_directory.join(CDS_COORDINATES_BASENAME).is_file());
    }

    #[test]
    fn test_cds_input_skips_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let schema_dir = single_locus_schema(dir.path());
        let inputs = dir.path().join("cds");
        fs::create_dir_all(&inputs).unwrap();
        let known = String::from_utf8(periodic(&X, 80, None)).unwrap();
        fs::write(inputs.join("sampleA.fasta"), format!(">cds1\n{}\n", known)).unwrap();

        let params = AlleleCallParams {
            input_files: inputs,
            schema_directory: schema_dir,
            output_directory: dir.path().join("results"),
            cds_input: true,
            ..Default::default()
        };
        let summary = run(&params).unwrap();
        assert_eq!(profile_lines(&summary.output_directory)[1], "sampleA\t1");
        assert!(!summary.output_directory.join(CDS_COORDINATES_BASENAME).exists());
    }
}
