// cgmlst.rs - ExtractCgMLST: loci present in most genomes

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::constants::CGMLST_THRESHOLDS;
use crate::data::loaders::read_id_list;
use crate::data::AllelicMatrix;
use crate::output::{write_lines, write_table};

#[derive(Debug, Clone)]
pub struct CgmlstParams {
    pub input_file: PathBuf,
    pub output_directory: PathBuf,
    pub genes_to_remove: Option<PathBuf>,
    pub genomes_to_remove: Option<PathBuf>,
    pub thresholds: Vec<f64>,
    /// Genomes added at each point of the loci curve
    pub step: usize,
}

impl Default for CgmlstParams {
    fn default() -> Self {
        Self {
            input_file: PathBuf::new(),
            output_directory: PathBuf::new(),
            genes_to_remove: None,
            genomes_to_remove: None,
            thresholds: CGMLST_THRESHOLDS.to_vec(),
            step: 1,
        }
    }
}

/// Threshold as the integer percentage used in file names
pub fn threshold_label(threshold: f64) -> String {
    format!("{}", (threshold * 100.0).round() as u32)
}

/// Loci present in at least `threshold` of the first `genomes` rows of a
/// presence/absence matrix
pub fn core_loci(presence: &AllelicMatrix, genomes: usize, threshold: f64) -> Vec<String> {
    if genomes == 0 {
        return Vec::new();
    }
    presence
        .locus_presence(genomes)
        .into_iter()
        .zip(&presence.loci_names)
        .filter(|(count, _)| *count as f64 / genomes as f64 >= threshold)
        .map(|(_, locus)| locus.clone())
        .collect()
}

/// Number of core loci per threshold as genomes are added in `step` increments
pub fn loci_curve(presence: &AllelicMatrix, thresholds: &[f64], step: usize) -> Vec<(usize, Vec<usize>)> {
    let total = presence.samples.len();
    let step = step.max(1);
    let mut points: Vec<usize> = (step..=total).step_by(step).collect();
    if points.last() != Some(&total) && total > 0 {
        points.push(total);
    }
    points
        .into_iter()
        .map(|n| {
            let counts = thresholds
                .iter()
                .map(|t| core_loci(presence, n, *t).len())
                .collect();
            (n, counts)
        })
        .collect()
}

fn write_missing_stats(path: &Path, masked: &AllelicMatrix) -> Result<(), String> {
    let loci = masked.loci_names.len().max(1) as f64;
    let rows: Vec<Vec<String>> = masked
        .samples
        .iter()
        .zip(masked.missing_per_sample())
        .map(|(s, missing)| {
            vec![
                s.sample_id.clone(),
                missing.to_string(),
                format!("{:.4}", missing as f64 / loci),
            ]
        })
        .collect();
    write_table(
        path,
        &["FILE".to_string(), "missing".to_string(), "percentage".to_string()],
        &rows,
    )
}

/// Determine the loci that constitute the cgMLST at each threshold
pub fn run(params: &CgmlstParams) -> Result<Vec<(f64, usize)>, String> {
    for threshold in &params.thresholds {
        if !(0.0..=1.0).contains(threshold) {
            return Err(format!("Threshold {} must be between 0 and 1", threshold));
        }
    }

    let mut matrix = AllelicMatrix::from_tsv(&params.input_file)?;
    matrix.print_matrix_statistics("INPUT MATRIX");
    if let Some(path) = &params.genes_to_remove {
        let loci = read_id_list(path)?;
        matrix = matrix.remove_loci(&loci, false);
        println!("🧹 Removed loci listed in {}", path.display());
    }
    if let Some(path) = &params.genomes_to_remove {
        let genomes = read_id_list(path)?;
        matrix.apply_sample_filtering(&genomes);
    }
    if matrix.samples.is_empty() {
        return Err("No genomes left in the profile matrix".to_string());
    }

    fs::create_dir_all(&params.output_directory).map_err(|e| {
        format!("Failed to create output directory {}: {}", params.output_directory.display(), e)
    })?;
    let out = &params.output_directory;

    let masked = matrix.masked();
    let presence = masked.presence_absence();
    presence.to_tsv(&out.join("Presence_Absence.tsv"))?;
    write_missing_stats(&out.join("mdata_stats.tsv"), &masked)?;

    let genomes = presence.samples.len();
    let mut summary = Vec::new();
    for threshold in &params.thresholds {
        let loci = core_loci(&presence, genomes, *threshold);
        let label = threshold_label(*threshold);
        masked
            .select_loci(&loci)
            .to_tsv(&out.join(format!("cgMLST{}.tsv", label)))?;
        write_lines(&out.join(format!("cgMLSTschema{}.txt", label)), &loci)?;
        println!("📊 cgMLST{}: {} loci", label, loci.len());
        summary.push((*threshold, loci.len()));
    }

    let curve = loci_curve(&presence, &params.thresholds, params.step);
    let header: Vec<String> = std::iter::once("Genomes".to_string())
        .chain(params.thresholds.iter().map(|t| threshold_label(*t)))
        .collect();
    let rows: Vec<Vec<String>> = curve
        .into_iter()
        .map(|(n, counts)| {
            std::iter::once(n.to_string())
                .chain(counts.into_iter().map(|c| c.to_string()))
                .collect()
        })
        .collect();
    write_table(&out.join("cgMLST_curve.tsv"), &header, &rows)?;

    println!("✅ Results written to {}", out.display());
    Ok(summary)
}
