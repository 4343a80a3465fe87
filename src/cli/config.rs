// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::cli::validation::{
    check_bsr, check_minimum_length, check_size_threshold, check_threshold,
    check_translation_table, parse_prediction_mode,
};

/// Values read from a TOML file. Command line arguments override them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub input_files: Option<String>,
    pub output_directory: Option<String>,
    pub schema_directory: Option<String>,
    pub training_file: Option<String>,
    pub genes_list: Option<String>,

    // Core settings
    pub blast_score_ratio: Option<f64>,
    pub minimum_length: Option<usize>,
    pub translation_table: Option<u8>,
    pub size_threshold: Option<f64>,
    pub prediction_mode: Option<String>,

    // Performance
    pub cpu_cores: Option<usize>,

    // CreateSchema clustering
    pub schema_name: Option<String>,
    pub word_size: Option<usize>,
    pub window_size: Option<usize>,
    pub clustering_sim: Option<f64>,
    pub representative_filter: Option<f64>,
    pub intra_filter: Option<f64>,

    // AlleleCall
    pub mode: Option<u8>,
    pub hash_profiles: Option<String>,

    // Flags
    pub cds_input: Option<bool>,
    pub no_cleanup: Option<bool>,
    pub no_inferred: Option<bool>,
    pub output_unclassified: Option<bool>,
    pub output_missing: Option<bool>,
    pub output_novel: Option<bool>,
    pub force_continue: Option<bool>,
    pub size_filter: Option<bool>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;
        config
            .validate()
            .map_err(|e| format!("Invalid config file '{}': {}", path.display(), e))?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        println!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Apply the command line checks to the values set in the file
    pub fn validate(&self) -> Result<(), String> {
        self.blast_score_ratio.map(check_bsr).transpose()?;
        self.minimum_length.map(check_minimum_length).transpose()?;
        self.translation_table.map(check_translation_table).transpose()?;
        self.size_threshold.map(check_size_threshold).transpose()?;
        for value in [self.clustering_sim, self.representative_filter, self.intra_filter]
            .into_iter()
            .flatten()
        {
            check_threshold(value)?;
        }
        if let Some(mode) = &self.prediction_mode {
            parse_prediction_mode(mode)?;
        }
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# chewbbaca.toml - Configuration file for chewbbaca
# Command line arguments will override these settings.
# Each subcommand reads the keys it understands and ignores the rest.

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Directory with FASTA files or a file listing their paths
input_files = "/path/to/genomes"

# Output directory
output_directory = "/path/to/output"

# Schema directory used by AlleleCall
schema_directory = "/path/to/schema_seed"

# Gene prediction training file
# training_file = "/path/to/species.trn"

# File with the loci to call, one per line
# genes_list = "loci.txt"

# =============================================================================
# CORE SETTINGS
# =============================================================================

# BLAST Score Ratio (> 0 and < 1)
blast_score_ratio = 0.6

# Minimum CDS length in nucleotides
minimum_length = 201

# Genetic code: 1, 2, 4, 11
translation_table = 11

# Allele size variation threshold
size_threshold = 0.2

# Gene prediction mode: single, meta
prediction_mode = "single"

# =============================================================================
# PERFORMANCE
# =============================================================================

# Number of CPU cores (reduced to the available cores minus two)
cpu_cores = 4

# =============================================================================
# CREATESCHEMA
# =============================================================================

schema_name = "schema_seed"
word_size = 5
window_size = 5
clustering_sim = 0.2
representative_filter = 0.9
intra_filter = 0.9

# =============================================================================
# ALLELECALL
# =============================================================================

# 1 exact DNA, 2 exact protein, 3 minimizer BSR, 4 full BSR
mode = 4

# Write hashed profiles: crc32, md5, sha256
# hash_profiles = "crc32"

# =============================================================================
# FLAGS
# =============================================================================

cds_input = false
no_cleanup = false
no_inferred = false
output_unclassified = false
output_missing = false
output_novel = false
force_continue = false
size_filter = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.blast_score_ratio, Some(0.6));
        assert_eq!(config.translation_table, Some(11));
        assert_eq!(config.mode, Some(4));
        assert_eq!(config.hash_profiles, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            blast_score_ratio: Some(0.7),
            cpu_cores: Some(2),
            ..Config::new()
        };
        config.to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);

        fs::write(&path, "blast_score_ratio = 1.5\n").unwrap();
        assert!(Config::from_file(&path).is_err());
        fs::write(&path, "translation_table = 3\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }
}
