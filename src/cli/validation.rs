// validation.rs - Input validation utilities

use std::path::{Path, PathBuf};

use crate::cli::args::{AlleleCallArgs, CreateSchemaArgs, PrepExternalSchemaArgs};
use crate::core::constants::{
    CLUSTERING_SIMILARITY_DEFAULT, DEFAULT_BSR, INTRA_CLUSTER_DEFAULT, MINIMUM_LENGTH_DEFAULT,
    MSL_MIN, REPRESENTATIVE_FILTER_DEFAULT, SIZE_THRESHOLD_DEFAULT, TRANSLATION_TABLE_DEFAULT,
    WINDOW_SIZE_DEFAULT, WORD_SIZE_DEFAULT,
};
use crate::core::translation::supported_tables;
use crate::core::{AlleleCallParams, CreateSchemaParams, PredictionMode, PrepSchemaParams};
use crate::hashers::HasherRegistry;

/// BLAST Score Ratio, strictly between 0 and 1
pub fn parse_bsr(value: &str) -> Result<f64, String> {
    let bsr: f64 = value
        .parse()
        .map_err(|_| format!("Invalid BSR value '{}'", value))?;
    check_bsr(bsr)
}

pub fn check_bsr(bsr: f64) -> Result<f64, String> {
    if bsr <= 0.0 || bsr >= 1.0 {
        return Err(format!("BSR value must be > 0 and < 1, got {}", bsr));
    }
    Ok(bsr)
}

pub fn parse_minimum_length(value: &str) -> Result<usize, String> {
    let length: usize = value
        .parse()
        .map_err(|_| format!("Invalid minimum length '{}'", value))?;
    check_minimum_length(length)
}

pub fn check_minimum_length(length: usize) -> Result<usize, String> {
    if length == 0 {
        return Err("Minimum length must be greater than 0".to_string());
    }
    Ok(length)
}

pub fn parse_translation_table(value: &str) -> Result<u8, String> {
    let table: u8 = value
        .parse()
        .map_err(|_| format!("Invalid translation table '{}'", value))?;
    check_translation_table(table)
}

pub fn check_translation_table(table: u8) -> Result<u8, String> {
    let supported = supported_tables();
    if !supported.contains(&table) {
        let names: Vec<String> = supported.iter().map(|t| t.to_string()).collect();
        return Err(format!(
            "Translation table {} is not supported. Available: {}",
            table,
            names.join(", ")
        ));
    }
    Ok(table)
}

pub fn parse_size_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("Invalid size threshold '{}'", value))?;
    check_size_threshold(threshold)
}

pub fn check_size_threshold(threshold: f64) -> Result<f64, String> {
    if threshold < 0.0 {
        return Err(format!("Size threshold must be >= 0, got {}", threshold));
    }
    Ok(threshold)
}

/// Proportion between 0 and 1 inclusive
pub fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|_| format!("Invalid threshold '{}'", value))?;
    check_threshold(threshold)
}

pub fn check_threshold(threshold: f64) -> Result<f64, String> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("Threshold must be between 0 and 1, got {}", threshold));
    }
    Ok(threshold)
}

pub fn parse_prediction_mode(value: &str) -> Result<PredictionMode, String> {
    value.parse()
}

/// Number of worker threads, one unless requested. Requests above the
/// available cores minus two are reduced with a warning.
pub fn resolve_cpu_cores(requested: Option<usize>, available: usize) -> usize {
    let limit = available.saturating_sub(2).max(1);
    match requested {
        Some(0) | None => 1,
        Some(cores) if cores > limit => {
            println!(
                "⚠️  Requested {} CPU cores but only {} are available. Using {}.",
                cores, available, limit
            );
            log::warn!("CPU cores reduced from {} to {}", cores, limit);
            limit
        }
        Some(cores) => cores,
    }
}

fn required(value: &Option<String>, flag: &str) -> Result<PathBuf, String> {
    value
        .as_ref()
        .map(PathBuf::from)
        .ok_or_else(|| format!("{} is required", flag))
}

fn existing(path: PathBuf, flag: &str) -> Result<PathBuf, String> {
    if !path.exists() {
        return Err(format!("{} path does not exist: {}", flag, path.display()));
    }
    Ok(path)
}

fn optional_file(value: &Option<String>, flag: &str) -> Result<Option<PathBuf>, String> {
    match value {
        Some(path) => {
            let path = existing(PathBuf::from(path), flag)?;
            if !Path::new(&path).is_file() {
                return Err(format!("{} must be a file: {}", flag, path.display()));
            }
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

/// Validate CreateSchema arguments and fill defaults
pub fn validate_create_schema(args: &CreateSchemaArgs) -> Result<CreateSchemaParams, String> {
    let size_threshold = if args.no_size_threshold {
        None
    } else {
        Some(args.size_threshold.unwrap_or(SIZE_THRESHOLD_DEFAULT))
    };
    let word_size = args.word_size.unwrap_or(WORD_SIZE_DEFAULT);
    let window_size = args.window_size.unwrap_or(WINDOW_SIZE_DEFAULT);
    if word_size == 0 || window_size == 0 {
        return Err("Word size and window size must be greater than 0".to_string());
    }

    Ok(CreateSchemaParams {
        input_files: existing(required(&args.input_files, "--input-files")?, "--input-files")?,
        output_directory: required(&args.output_directory, "--output-directory")?,
        schema_name: args
            .schema_name
            .clone()
            .unwrap_or_else(|| "schema_seed".to_string()),
        training_file: optional_file(&args.training_file, "--training-file")?,
        bsr: args.blast_score_ratio.unwrap_or(DEFAULT_BSR),
        minimum_length: args.minimum_length.unwrap_or(MINIMUM_LENGTH_DEFAULT),
        translation_table: args.translation_table.unwrap_or(TRANSLATION_TABLE_DEFAULT),
        size_threshold,
        word_size,
        window_size,
        clustering_sim: args.clustering_sim.unwrap_or(CLUSTERING_SIMILARITY_DEFAULT),
        representative_filter: args
            .representative_filter
            .unwrap_or(REPRESENTATIVE_FILTER_DEFAULT),
        intra_filter: args.intra_filter.unwrap_or(INTRA_CLUSTER_DEFAULT),
        prediction_mode: args.prediction_mode.unwrap_or(PredictionMode::Single),
        cds_input: args.cds_input,
        no_cleanup: args.no_cleanup,
    })
}

/// Validate AlleleCall arguments. Unset values stay unset and are taken
/// from the schema config.
pub fn validate_allele_call(args: &AlleleCallArgs) -> Result<AlleleCallParams, String> {
    let mode = args.mode.unwrap_or(4);
    if !(1..=4).contains(&mode) {
        return Err(format!("Invalid mode {}. Use a value between 1 and 4", mode));
    }
    if let Some(name) = &args.hash_profiles {
        let registry = HasherRegistry::new();
        if !registry.has_hasher(name) {
            return Err(format!(
                "Invalid hash type '{}'. Available: {}",
                name,
                registry.get_hasher_names().join(", ")
            ));
        }
    }

    Ok(AlleleCallParams {
        input_files: existing(required(&args.input_files, "--input-files")?, "--input-files")?,
        schema_directory: existing(
            required(&args.schema_directory, "--schema-directory")?,
            "--schema-directory",
        )?,
        output_directory: required(&args.output_directory, "--output-directory")?,
        training_file: optional_file(&args.training_file, "--training-file")?,
        genes_list: optional_file(&args.genes_list, "--genes-list")?,
        bsr: args.blast_score_ratio,
        minimum_length: args.minimum_length,
        translation_table: args.translation_table,
        size_threshold: args.size_threshold,
        prediction_mode: args.prediction_mode.unwrap_or(PredictionMode::Single),
        cds_input: args.cds_input,
        no_inferred: args.no_inferred,
        output_unclassified: args.output_unclassified,
        output_missing: args.output_missing,
        output_novel: args.output_novel,
        no_cleanup: args.no_cleanup,
        hash_profiles: args.hash_profiles.clone(),
        force_continue: args.force_continue,
        mode,
    })
}

/// Validate PrepExternalSchema arguments and fill defaults
pub fn validate_prep_schema(args: &PrepExternalSchemaArgs) -> Result<PrepSchemaParams, String> {
    Ok(PrepSchemaParams {
        input_files: existing(required(&args.input_files, "--input-files")?, "--input-files")?,
        output_directory: required(&args.output_directory, "--output-directory")?,
        training_file: optional_file(&args.training_file, "--training-file")?,
        bsr: args.blast_score_ratio.unwrap_or(DEFAULT_BSR),
        minimum_length: args.minimum_length.unwrap_or(MSL_MIN),
        translation_table: args.translation_table.unwrap_or(TRANSLATION_TABLE_DEFAULT),
        size_threshold: Some(args.size_threshold.unwrap_or(SIZE_THRESHOLD_DEFAULT)),
        size_filter: args.size_filter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bsr_bounds() {
        assert_eq!(parse_bsr("0.6"), Ok(0.6));
        assert!(parse_bsr("0").is_err());
        assert!(parse_bsr("1").is_err());
        assert!(parse_bsr("abc").is_err());
    }

    #[test]
    fn test_parse_numeric_options() {
        assert_eq!(parse_minimum_length("201"), Ok(201));
        assert!(parse_minimum_length("0").is_err());
        assert_eq!(parse_translation_table("11"), Ok(11));
        assert!(parse_translation_table("7").is_err());
        assert_eq!(parse_size_threshold("0"), Ok(0.0));
        assert!(parse_size_threshold("-0.1").is_err());
        assert!(parse_threshold("1.5").is_err());
        assert_eq!(parse_prediction_mode("META"), Ok(PredictionMode::Meta));
    }

    #[test]
    fn test_resolve_cpu_cores() {
        assert_eq!(resolve_cpu_cores(None, 8), 1);
        assert_eq!(resolve_cpu_cores(Some(0), 8), 1);
        assert_eq!(resolve_cpu_cores(Some(4), 8), 4);
        assert_eq!(resolve_cpu_cores(Some(16), 8), 6);
        assert_eq!(resolve_cpu_cores(Some(2), 2), 1);
    }

    #[test]
    fn test_validate_allele_call_requires_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = AlleleCallArgs {
            input_files: Some(dir.path().to_string_lossy().to_string()),
            schema_directory: None,
            output_directory: Some("results".to_string()),
            training_file: None,
            genes_list: None,
            blast_score_ratio: None,
            minimum_length: None,
            translation_table: None,
            size_threshold: None,
            cpu_cores: None,
            prediction_mode: None,
            cds_input: false,
            no_inferred: false,
            output_unclassified: false,
            output_missing: false,
            output_novel: false,
            no_cleanup: false,
            hash_profiles: Some("sha1".to_string()),
            force_continue: false,
            mode: None,
        };
        let err = validate_allele_call(&args).err().unwrap();
        assert!(err.starts_with("Invalid hash type 'sha1'"));

        args.hash_profiles = Some("crc32".to_string());
        let err = validate_allele_call(&args).err().unwrap();
        assert_eq!(err, "--schema-directory is required");

        args.schema_directory = Some(dir.path().to_string_lossy().to_string());
        let params = validate_allele_call(&args).unwrap();
        assert_eq!(params.mode, 4);
        assert_eq!(params.bsr, None);
    }
}
