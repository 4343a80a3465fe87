// schema.rs - Schema directory layout, configuration and pre-computed data

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::constants::{
    CHAR_REPLACEMENTS, CLUSTERING_SIMILARITY_DEFAULT, DEFAULT_BSR, GENES_LIST, HASH_TABLES,
    INTRA_CLUSTER_DEFAULT, MINIMUM_LENGTH_DEFAULT, PRE_COMPUTED_DIR, REPRESENTATIVE_FILTER_DEFAULT,
    SCHEMA_CONFIG, SCHEMA_INVALID_PATH, SCHEMA_PATH_MISSING, SELF_SCORES, SHORT_DIR,
    SIZE_THRESHOLD_DEFAULT, TRANSLATION_TABLE_DEFAULT, WINDOW_SIZE_DEFAULT, WORD_SIZE_DEFAULT,
};
use crate::core::translation::{translate_dna, GeneticCode};
use crate::data::sequence::{append_fasta, read_fasta, sequence_hash, write_fasta, SequenceRecord};

/// Parameters a schema was created with, stored as `.schema_config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub bsr: f64,
    pub prodigal_training_file: Option<String>,
    pub translation_table: u8,
    pub minimum_locus_length: usize,
    #[serde(rename = "chewBBACA_version")]
    pub chewbbaca_version: String,
    pub size_threshold: Option<f64>,
    pub word_size: usize,
    pub window_size: usize,
    pub cluster_sim: f64,
    pub representative_filter: f64,
    #[serde(rename = "intraCluster_filter")]
    pub intra_cluster_filter: f64,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            bsr: DEFAULT_BSR,
            prodigal_training_file: None,
            translation_table: TRANSLATION_TABLE_DEFAULT,
            minimum_locus_length: MINIMUM_LENGTH_DEFAULT,
            chewbbaca_version: env!("CARGO_PKG_VERSION").to_string(),
            size_threshold: Some(SIZE_THRESHOLD_DEFAULT),
            word_size: WORD_SIZE_DEFAULT,
            window_size: WINDOW_SIZE_DEFAULT,
            cluster_sim: CLUSTERING_SIMILARITY_DEFAULT,
            representative_filter: REPRESENTATIVE_FILTER_DEFAULT,
            intra_cluster_filter: INTRA_CLUSTER_DEFAULT,
        }
    }
}

impl SchemaConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read schema config {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse schema config {}: {}", path.display(), e))
    }

    pub fn to_file(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize schema config: {}", e))?;
        fs::write(path, content)
            .map_err(|e| format!("Failed to write schema config {}: {}", path.display(), e))
    }
}

/// A single allele of a locus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allele {
    /// Allele identifier without the locus prefix
    pub id: String,
    pub sequence: Vec<u8>,
}

impl Allele {
    /// Numeric value of the identifier, ignoring a leading `*`
    pub fn number(&self) -> Option<u64> {
        self.id.trim_start_matches('*').parse().ok()
    }
}

/// Locus with its alleles and representative alleles
#[derive(Debug, Clone)]
pub struct Locus {
    pub id: String,
    pub alleles: Vec<Allele>,
    pub representatives: Vec<Allele>,
}

impl Locus {
    pub fn record_id(&self, allele_id: &str) -> String {
        format!("{}_{}", self.id, allele_id)
    }

    /// Highest numeric allele identifier, 0 for empty loci
    pub fn max_allele_id(&self) -> u64 {
        self.alleles
            .iter()
            .filter_map(|a| a.number())
            .max()
            .unwrap_or(0)
    }

    /// Most frequent allele length. Ties resolve to the shortest length.
    pub fn length_mode(&self) -> Option<usize> {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for allele in &self.alleles {
            *counts.entry(allele.sequence.len()).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(length, _)| length)
    }
}

/// Split a record id into the allele identifier given the locus id
pub fn allele_id_from_record(locus: &str, record_id: &str) -> String {
    let prefix = format!("{}_", locus);
    match record_id.strip_prefix(&prefix) {
        Some(id) => id.to_string(),
        None => record_id
            .rsplit('_')
            .next()
            .unwrap_or(record_id)
            .to_string(),
    }
}

/// Locus identifier derived from a sequence identifier
pub fn locus_id_from(sequence_id: &str) -> String {
    let mut id = sequence_id.to_string();
    for (from, to) in CHAR_REPLACEMENTS {
        id = id.replace(from, to);
    }
    id
}

/// Representative self alignment scores keyed by record id
pub type SelfScores = BTreeMap<String, i32>;

pub fn save_self_scores(path: &Path, scores: &SelfScores) -> Result<(), String> {
    let encoded = bincode::serialize(scores)
        .map_err(|e| format!("Failed to serialize self-scores: {}", e))?;
    let compressed = lz4_flex::compress_prepend_size(&encoded);
    fs::write(path, compressed)
        .map_err(|e| format!("Failed to write self-scores {}: {}", path.display(), e))
}

pub fn load_self_scores(path: &Path) -> Result<SelfScores, String> {
    let compressed = fs::read(path)
        .map_err(|e| format!("Failed to read self-scores {}: {}", path.display(), e))?;
    let decompressed = lz4_flex::decompress_size_prepended(&compressed)
        .map_err(|e| format!("Failed to decompress self-scores: {}", e))?;
    bincode::deserialize(&decompressed).map_err(|e| format!("Failed to deserialize self-scores: {}", e))
}

/// DNA and protein hash tables for exact matching against a schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashTables {
    /// Identifies the schema state the tables were built from
    pub fingerprint: String,
    pub translation_table: u8,
    /// DNA hash -> (locus, allele id)
    pub dna: HashMap<String, Vec<(String, String)>>,
    /// Protein hash -> (locus, allele id)
    pub protein: HashMap<String, Vec<(String, String)>>,
}

impl HashTables {
    pub fn build(schema: &Schema, code: &GeneticCode) -> Self {
        let mut tables = HashTables {
            fingerprint: schema.fingerprint(),
            translation_table: code.id,
            ..Default::default()
        };

        for locus in &schema.loci {
            for allele in &locus.alleles {
                let entry = (locus.id.clone(), allele.id.clone());
                tables
                    .dna
                    .entry(sequence_hash(&allele.sequence))
                    .or_default()
                    .push(entry.clone());
                if let Ok((protein, _)) = translate_dna(&allele.sequence, code, 0) {
                    tables
                        .protein
                        .entry(sequence_hash(&protein))
                        .or_default()
                        .push(entry);
                }
            }
        }

        tables
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let encoded = rmp_serde::to_vec(self)
            .map_err(|e| format!("Failed to serialize hash tables: {}", e))?;
        let compressed = lz4_flex::compress_prepend_size(&encoded);
        fs::write(path, compressed)
            .map_err(|e| format!("Failed to write hash tables {}: {}", path.display(), e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let compressed = fs::read(path)
            .map_err(|e| format!("Failed to read hash tables {}: {}", path.display(), e))?;
        let decompressed = lz4_flex::decompress_size_prepended(&compressed)
            .map_err(|e| format!("Failed to decompress hash tables: {}", e))?;
        rmp_serde::from_slice(&decompressed)
            .map_err(|e| format!("Failed to deserialize hash tables: {}", e))
    }
}

/// Schema loaded from disk
#[derive(Debug, Clone)]
pub struct Schema {
    pub path: PathBuf,
    pub config: Option<SchemaConfig>,
    pub loci: Vec<Locus>,
}

impl Schema {
    pub fn short_dir(path: &Path) -> PathBuf {
        path.join(SHORT_DIR)
    }

    pub fn locus_file(path: &Path, locus: &str) -> PathBuf {
        path.join(format!("{}.fasta", locus))
    }

    pub fn short_file(path: &Path, locus: &str) -> PathBuf {
        Self::short_dir(path).join(format!("{}_short.fasta", locus))
    }

    pub fn self_scores_file(path: &Path) -> PathBuf {
        Self::short_dir(path).join(SELF_SCORES)
    }

    pub fn hash_tables_file(path: &Path) -> PathBuf {
        path.join(PRE_COMPUTED_DIR).join(HASH_TABLES)
    }

    /// Check that a directory contains the files a schema needs
    pub fn validate_path(path: &Path) -> Result<(), String> {
        if !path.exists() {
            return Err(SCHEMA_PATH_MISSING.to_string());
        }
        if !Self::short_dir(path).is_dir() || Self::locus_files(path)?.is_empty() {
            return Err(SCHEMA_INVALID_PATH.to_string());
        }
        Ok(())
    }

    /// Locus identifiers from `.genes_list`, or from the FASTA files present
    pub fn locus_files(path: &Path) -> Result<Vec<String>, String> {
        let genes_list = path.join(GENES_LIST);
        if genes_list.is_file() {
            let content = fs::read_to_string(&genes_list)
                .map_err(|e| format!("Failed to read {}: {}", genes_list.display(), e))?;
            let files: Vec<String> = serde_json::from_str(&content)
                .map_err(|e| format!("Failed to parse {}: {}", genes_list.display(), e))?;
            return Ok(files
                .into_iter()
                .map(|f| f.trim_end_matches(".fasta").to_string())
                .collect());
        }

        let mut loci = Vec::new();
        let entries = fs::read_dir(path)
            .map_err(|e| format!("Failed to read schema directory {}: {}", path.display(), e))?;
        for entry in entries {
            let entry_path = entry
                .map_err(|e| format!("Failed to read directory entry: {}", e))?
                .path();
            if entry_path.is_file()
                && entry_path.extension().and_then(|e| e.to_str()) == Some("fasta")
            {
                if let Some(stem) = entry_path.file_stem() {
                    loci.push(stem.to_string_lossy().to_string());
                }
            }
        }
        loci.sort();
        Ok(loci)
    }

    /// Load a schema, optionally restricted to a set of loci
    pub fn load(path: &Path, loci_filter: Option<&[String]>) -> Result<Self, String> {
        Self::validate_path(path)?;

        let config_path = path.join(SCHEMA_CONFIG);
        let config = if config_path.is_file() {
            Some(SchemaConfig::from_file(&config_path)?)
        } else {
            None
        };

        let locus_ids = match loci_filter {
            Some(filter) => {
                let available = Self::locus_files(path)?;
                let mut selected = Vec::new();
                for locus in filter {
                    if !available.contains(locus) {
                        return Err(format!("Locus {} is not in the schema", locus));
                    }
                    selected.push(locus.clone());
                }
                selected
            }
            None => Self::locus_files(path)?,
        };

        let loci = locus_ids
            .par_iter()
            .map(|locus_id| Self::load_locus(path, locus_id))
            .collect::<Result<Vec<_>, String>>()?;

        log::info!("Loaded schema {} with {} loci", path.display(), loci.len());
        Ok(Self {
            path: path.to_path_buf(),
            config,
            loci,
        })
    }

    fn load_locus(path: &Path, locus_id: &str) -> Result<Locus, String> {
        let to_alleles = |records: Vec<SequenceRecord>| -> Vec<Allele> {
            records
                .into_iter()
                .map(|r| Allele {
                    id: allele_id_from_record(locus_id, &r.id),
                    sequence: r.sequence,
                })
                .collect()
        };

        let alleles = to_alleles(read_fasta(&Self::locus_file(path, locus_id))?);
        let short = Self::short_file(path, locus_id);
        let representatives = if short.is_file() {
            to_alleles(read_fasta(&short)?)
        } else {
            return Err(format!(
                "{} Missing representative file for locus {}",
                SCHEMA_INVALID_PATH, locus_id
            ));
        };

        Ok(Locus {
            id: locus_id.to_string(),
            alleles,
            representatives,
        })
    }

    /// Digest of loci names and allele counts
    pub fn fingerprint(&self) -> String {
        let mut summary = String::new();
        for locus in &self.loci {
            summary.push_str(&format!("{}:{};", locus.id, locus.alleles.len()));
        }
        sequence_hash(summary.as_bytes())
    }

    pub fn locus_index(&self) -> HashMap<&str, usize> {
        self.loci
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.as_str(), i))
            .collect()
    }

    pub fn total_alleles(&self) -> usize {
        self.loci.iter().map(|l| l.alleles.len()).sum()
    }

    /// Load pre-computed hash tables, rebuilding them when they are missing
    /// or were built for a different schema state
    pub fn hash_tables(&self, code: &GeneticCode) -> Result<HashTables, String> {
        let path = Self::hash_tables_file(&self.path);
        if path.is_file() {
            match HashTables::load(&path) {
                Ok(tables)
                    if tables.fingerprint == self.fingerprint()
                        && tables.translation_table == code.id =>
                {
                    return Ok(tables)
                }
                Ok(_) => log::info!("Pre-computed hash tables are outdated, rebuilding"),
                Err(e) => log::warn!("{}, rebuilding", e),
            }
        }

        let tables = HashTables::build(self, code);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        tables.save(&path)?;
        Ok(tables)
    }
}

/// Alleles and representatives of a locus to write into a new schema
pub struct LocusSeed {
    pub id: String,
    pub alleles: Vec<SequenceRecord>,
    pub representatives: Vec<SequenceRecord>,
}

/// Write a complete schema structure: locus files, representative files,
/// config, genes list and self-scores
pub fn write_schema(
    path: &Path,
    loci: &[LocusSeed],
    config: &SchemaConfig,
    self_scores: &SelfScores,
) -> Result<(), String> {
    let short = Schema::short_dir(path);
    fs::create_dir_all(&short)
        .map_err(|e| format!("Failed to create schema directory {}: {}", short.display(), e))?;

    loci.par_iter()
        .map(|locus| {
            write_fasta(&Schema::locus_file(path, &locus.id), &locus.alleles)?;
            write_fasta(&Schema::short_file(path, &locus.id), &locus.representatives)
        })
        .collect::<Result<Vec<()>, String>>()?;

    config.to_file(&path.join(SCHEMA_CONFIG))?;
    write_genes_list(path, loci.iter().map(|l| l.id.as_str()))?;
    save_self_scores(&Schema::self_scores_file(path), self_scores)?;
    Ok(())
}

pub fn write_genes_list<'a, I>(path: &Path, loci: I) -> Result<(), String>
where
    I: IntoIterator<Item = &'a str>,
{
    let files: Vec<String> = loci.into_iter().map(|l| format!("{}.fasta", l)).collect();
    let list_path = path.join(GENES_LIST);
    let file = File::create(&list_path)
        .map_err(|e| format!("Failed to create {}: {}", list_path.display(), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &files)
        .map_err(|e| format!("Failed to write genes list: {}", e))?;
    writer
        .flush()
        .map_err(|e| format!("Failed to flush genes list: {}", e))
}

/// Append novel alleles and new representatives to an existing schema
pub fn add_alleles(
    path: &Path,
    novel: &BTreeMap<String, Vec<SequenceRecord>>,
    representatives: &BTreeMap<String, Vec<SequenceRecord>>,
) -> Result<(), String> {
    for (locus, records) in novel {
        append_fasta(&Schema::locus_file(path, locus), records)?;
    }
    for (locus, records) in representatives {
        append_fasta(&Schema::short_file(path, locus), records)?;
    }
    Ok(())
}

/// Read a schema's self-scores file when it exists
pub fn read_self_scores_if_present(path: &Path) -> Result<SelfScores, String> {
    let scores_path = Schema::self_scores_file(path);
    if !scores_path.is_file() {
        return Ok(SelfScores::new());
    }
    load_self_scores(&scores_path)
}
