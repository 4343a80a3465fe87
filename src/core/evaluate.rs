// evaluate.rs - SchemaEvaluator: per-locus allele length and validity report

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::core::allele_call::classify::{size_class, LocusClass};
use crate::core::translation::{translate_dna, GeneticCode};
use crate::data::schema::{Locus, Schema};
use crate::output::write_table;

#[derive(Debug, Clone, Default)]
pub struct EvaluateParams {
    pub schema_directory: PathBuf,
    pub output_directory: PathBuf,
    /// Defaults to the schema config values
    pub translation_table: Option<u8>,
    pub minimum_length: Option<usize>,
    pub size_threshold: Option<f64>,
    pub loci: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocusReport {
    pub locus: String,
    pub alleles: usize,
    pub valid: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub median_length: f64,
    pub mode_length: usize,
    pub below_mode: usize,
    pub above_mode: usize,
    pub representatives: usize,
}

impl LocusReport {
    pub const HEADER: [&'static str; 10] = [
        "Locus",
        "Total_alleles",
        "Valid_alleles",
        "Min_length",
        "Max_length",
        "Median_length",
        "Mode_length",
        "Alleles_below_threshold",
        "Alleles_above_threshold",
        "Representatives",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.locus.clone(),
            self.alleles.to_string(),
            self.valid.to_string(),
            self.min_length.to_string(),
            self.max_length.to_string(),
            format!("{:.1}", self.median_length),
            self.mode_length.to_string(),
            self.below_mode.to_string(),
            self.above_mode.to_string(),
            self.representatives.to_string(),
        ]
    }
}

fn median(sorted: &[usize]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2] as f64,
        n => (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0,
    }
}

pub fn evaluate_locus(
    locus: &Locus,
    code: &GeneticCode,
    minimum_length: usize,
    size_threshold: Option<f64>,
) -> LocusReport {
    let mut lengths: Vec<usize> = locus.alleles.iter().map(|a| a.sequence.len()).collect();
    lengths.sort_unstable();
    let valid = locus
        .alleles
        .iter()
        .filter(|a| translate_dna(&a.sequence, code, minimum_length).is_ok())
        .count();

    let mode = locus.length_mode().unwrap_or(0);
    let mut below_mode = 0;
    let mut above_mode = 0;
    if let Some(threshold) = size_threshold {
        for length in &lengths {
            match size_class(*length, mode, threshold) {
                Some(LocusClass::Asm) => below_mode += 1,
                Some(_) => above_mode += 1,
                None => {}
            }
        }
    }

    LocusReport {
        locus: locus.id.clone(),
        alleles: lengths.len(),
        valid,
        min_length: lengths.first().copied().unwrap_or(0),
        max_length: lengths.last().copied().unwrap_or(0),
        median_length: median(&lengths),
        mode_length: mode,
        below_mode,
        above_mode,
        representatives: locus.representatives.len(),
    }
}

/// Evaluate every locus of a schema and write the locus and summary tables
pub fn run(params: &EvaluateParams) -> Result<Vec<LocusReport>, String> {
    Schema::validate_path(&params.schema_directory)?;
    let schema = Schema::load(&params.schema_directory, params.loci.as_deref())?;
    let config = schema.config.clone().unwrap_or_default();
    let code = GeneticCode::new(params.translation_table.unwrap_or(config.translation_table))?;
    let minimum_length = params.minimum_length.unwrap_or(config.minimum_locus_length);
    let size_threshold = params.size_threshold.or(config.size_threshold);
    println!("🔍 Evaluating {} loci...", schema.loci.len());

    let reports: Vec<LocusReport> = schema
        .loci
        .par_iter()
        .map(|locus| evaluate_locus(locus, &code, minimum_length, size_threshold))
        .collect();

    fs::create_dir_all(&params.output_directory).map_err(|e| {
        format!("Failed to create output directory {}: {}", params.output_directory.display(), e)
    })?;
    let header: Vec<String> = LocusReport::HEADER.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = reports.iter().map(|r| r.row()).collect();
    write_table(&params.output_directory.join("schema_report.tsv"), &header, &rows)?;

    let total_alleles: usize = reports.iter().map(|r| r.alleles).sum();
    let total_valid: usize = reports.iter().map(|r| r.valid).sum();
    let outside: usize = reports.iter().map(|r| r.below_mode + r.above_mode).sum();
    let mut allele_counts: Vec<usize> = reports.iter().map(|r| r.alleles).collect();
    allele_counts.sort_unstable();
    let summary = [
        ("Loci", reports.len().to_string()),
        ("Total_alleles", total_alleles.to_string()),
        ("Valid_alleles", total_valid.to_string()),
        ("Invalid_alleles", (total_alleles - total_valid).to_string()),
        ("Alleles_outside_threshold", outside.to_string()),
        ("Median_alleles_per_locus", format!("{:.1}", median(&allele_counts))),
        ("Translation_table", code.id.to_string()),
        ("Minimum_length", minimum_length.to_string()),
        (
            "Size_threshold",
            size_threshold.map(|t| t.to_string()).unwrap_or_else(|| "None".to_string()),
        ),
    ];
    let summary_rows: Vec<Vec<String>> = summary
        .iter()
        .map(|(k, v)| vec![k.to_string(), v.clone()])
        .collect();
    write_table(
        &params.output_directory.join("schema_summary.tsv"),
        &["Statistic".to_string(), "Value".to_string()],
        &summary_rows,
    )?;

    let mut by_count: BTreeMap<usize, usize> = BTreeMap::new();
    for r in &reports {
        *by_count.entry(r.alleles).or_default() += 1;
    }
    log::debug!("Loci per allele count: {:?}", by_count);
    println!(
        "📊 {} loci, {} alleles ({} valid, {} outside size threshold)",
        reports.len(),
        total_alleles,
        total_valid,
        outside
    );
    println!("✅ Report written to {}", params.output_directory.display());
    Ok(reports)
}
