// profile.rs - Allelic profile and matrix data structures

use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::output::write_table;

/// Label used for loci absent from some of the joined matrices
pub const JOIN_FILL: &str = "LNF";

/// Represents a single sample's allelic profile
#[derive(Debug, Clone, PartialEq)]
pub struct AllelicProfile {
    pub sample_id: String,
    /// One cell per locus, in the matrix loci order
    pub alleles: Vec<String>,
}

/// Collection of allelic profiles with associated metadata
#[derive(Debug, Clone, PartialEq)]
pub struct AllelicMatrix {
    pub samples: Vec<AllelicProfile>,
    pub loci_names: Vec<String>,
}

impl Default for AllelicMatrix {
    fn default() -> Self {
        Self::new()
    }
}

/// Cell value after masking: allele numbers stay, `INF-` prefixes are
/// removed and every class label becomes `0`
pub fn mask_allele(cell: &str) -> String {
    let value = cell.trim().trim_start_matches("INF-");
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        value.to_string()
    } else {
        "0".to_string()
    }
}

impl AllelicMatrix {
    /// Create a new empty matrix
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            loci_names: Vec::new(),
        }
    }

    /// Write the matrix as a `FILE` headed TSV
    pub fn to_tsv(&self, file_path: &Path) -> Result<(), String> {
        let header: Vec<String> = std::iter::once("FILE".to_string())
            .chain(self.loci_names.iter().cloned())
            .collect();
        let rows: Vec<Vec<String>> = self
            .samples
            .iter()
            .map(|s| {
                std::iter::once(s.sample_id.clone())
                    .chain(s.alleles.iter().cloned())
                    .collect()
            })
            .collect();
        write_table(file_path, &header, &rows)
    }

    /// Matrix restricted to the given loci, in the given order
    pub fn select_loci(&self, loci: &[String]) -> Self {
        let positions: HashMap<&str, usize> = self
            .loci_names
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();
        let columns: Vec<usize> = loci
            .iter()
            .filter_map(|l| positions.get(l.as_str()).copied())
            .collect();

        Self {
            loci_names: columns.iter().map(|c| self.loci_names[*c].clone()).collect(),
            samples: self
                .samples
                .iter()
                .map(|s| AllelicProfile {
                    sample_id: s.sample_id.clone(),
                    alleles: columns.iter().map(|c| s.alleles[*c].clone()).collect(),
                })
                .collect(),
        }
    }

    /// Remove the listed loci, or keep only them with `inverse`. Locus names
    /// are compared without a `.fasta` suffix.
    pub fn remove_loci(&self, loci: &HashSet<String>, inverse: bool) -> Self {
        let normalized: HashSet<&str> = loci.iter().map(|l| l.trim_end_matches(".fasta")).collect();
        let kept: Vec<String> = self
            .loci_names
            .iter()
            .filter(|l| normalized.contains(l.trim_end_matches(".fasta")) == inverse)
            .cloned()
            .collect();
        self.select_loci(&kept)
    }

    /// Remove samples whose ids are in the set
    pub fn apply_sample_filtering(&mut self, samples_exclude: &HashSet<String>) {
        let initial_samples = self.samples.len();
        self.samples
            .retain(|sample| !samples_exclude.contains(&sample.sample_id));
        let filtered_samples = self.samples.len();
        if initial_samples != filtered_samples {
            println!(
                "Sample filters: kept {} samples (removed {})",
                filtered_samples,
                initial_samples - filtered_samples
            );
        }
    }

    /// Masked copy of the matrix
    pub fn masked(&self) -> Self {
        Self {
            loci_names: self.loci_names.clone(),
            samples: self
                .samples
                .par_iter()
                .map(|s| AllelicProfile {
                    sample_id: s.sample_id.clone(),
                    alleles: s.alleles.iter().map(|a| mask_allele(a)).collect(),
                })
                .collect(),
        }
    }

    /// 1 where a masked matrix has an allele, 0 otherwise
    pub fn presence_absence(&self) -> Self {
        Self {
            loci_names: self.loci_names.clone(),
            samples: self
                .samples
                .iter()
                .map(|s| AllelicProfile {
                    sample_id: s.sample_id.clone(),
                    alleles: s
                        .alleles
                        .iter()
                        .map(|a| if a == "0" { "0" } else { "1" }.to_string())
                        .collect(),
                })
                .collect(),
        }
    }

    /// Number of samples with an allele for each locus, counting only the
    /// first `samples` rows of a presence/absence matrix
    pub fn locus_presence(&self, samples: usize) -> Vec<usize> {
        let mut counts = vec![0; self.loci_names.len()];
        for sample in self.samples.iter().take(samples) {
            for (count, cell) in counts.iter_mut().zip(&sample.alleles) {
                if cell != "0" {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Missing cells per sample of a masked matrix
    pub fn missing_per_sample(&self) -> Vec<usize> {
        self.samples
            .iter()
            .map(|s| s.alleles.iter().filter(|a| *a == "0").count())
            .collect()
    }

    /// Join matrices sample-wise. Without `common` the loci are the union in
    /// first seen order and absent loci are filled with LNF; with `common`
    /// only the loci shared by all matrices are kept.
    pub fn join(matrices: &[AllelicMatrix], common: bool) -> Result<Self, String> {
        if matrices.len() < 2 {
            return Err("At least two profile matrices are needed to join".to_string());
        }

        let mut loci: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for matrix in matrices {
            for locus in &matrix.loci_names {
                if seen.insert(locus.as_str()) {
                    loci.push(locus.clone());
                }
            }
        }
        if common {
            loci.retain(|locus| matrices.iter().all(|m| m.loci_names.contains(locus)));
            if loci.is_empty() {
                return Err("The profile matrices have no loci in common".to_string());
            }
        }

        let mut samples = Vec::new();
        for matrix in matrices {
            let positions: HashMap<&str, usize> = matrix
                .loci_names
                .iter()
                .enumerate()
                .map(|(i, l)| (l.as_str(), i))
                .collect();
            for sample in &matrix.samples {
                let alleles = loci
                    .iter()
                    .map(|locus| match positions.get(locus.as_str()) {
                        Some(&i) => sample.alleles[i].clone(),
                        None => JOIN_FILL.to_string(),
                    })
                    .collect();
                samples.push(AllelicProfile {
                    sample_id: sample.sample_id.clone(),
                    alleles,
                });
            }
        }

        Ok(Self {
            samples,
            loci_names: loci,
        })
    }

    /// Print matrix statistics
    pub fn print_matrix_statistics(&self, phase: &str) {
        println!("\n📊 === MATRIX STATISTICS ({}) ===", phase);
        let total_cells = self.samples.len() * self.loci_names.len();
        let masked = self.masked();
        let sample_missing = masked.missing_per_sample();
        let locus_presence = masked.locus_presence(masked.samples.len());

        println!(
            "  📏 Dimensions: {} samples × {} loci = {} total cells",
            self.samples.len(),
            self.loci_names.len(),
            total_cells
        );
        if total_cells == 0 {
            return;
        }

        let total_missing: usize = sample_missing.iter().sum();
        let global_missing_percent = 100.0 * total_missing as f64 / total_cells as f64;
        print!(
            "  📊 Missing data: {:.2}% ({} cells)",
            global_missing_percent, total_missing
        );
        if global_missing_percent <= 5.0 {
            println!("  🟢 EXCELLENT: Very low missing data");
        } else if global_missing_percent <= 15.0 {
            println!("  🟡 GOOD: Acceptable missing data");
        } else if global_missing_percent <= 30.0 {
            println!("  🟠 FAIR: High missing data");
        } else {
            println!("  🔴 POOR: Very high missing data");
        }

        let complete_samples = sample_missing.iter().filter(|m| **m == 0).count();
        let complete_loci = locus_presence
            .iter()
            .filter(|p| **p == self.samples.len())
            .count();
        println!(
            "  ✅ Complete samples: {} ({:.1}%)",
            complete_samples,
            100.0 * complete_samples as f64 / self.samples.len() as f64
        );
        println!(
            "  ✅ Complete loci: {} ({:.1}%)",
            complete_loci,
            100.0 * complete_loci as f64 / self.loci_names.len() as f64
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(loci: &[&str], rows: &[(&str, &[&str])]) -> AllelicMatrix {
        AllelicMatrix {
            loci_names: loci.iter().map(|l| l.to_string()).collect(),
            samples: rows
                .iter()
                .map(|(id, alleles)| AllelicProfile {
                    sample_id: id.to_string(),
                    alleles: alleles.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_mask_allele() {
        assert_eq!(mask_allele("12"), "12");
        assert_eq!(mask_allele("INF-7"), "7");
        assert_eq!(mask_allele("LNF"), "0");
        assert_eq!(mask_allele("PLOT3"), "0");
        assert_eq!(mask_allele(""), "0");
    }

    #[test]
    fn test_remove_loci_and_inverse() {
        let m = matrix(&["a", "b", "c"], &[("g1", &["1", "2", "3"])]);
        let remove: HashSet<String> = ["b.fasta".to_string()].into_iter().collect();

        let removed = m.remove_loci(&remove, false);
        assert_eq!(removed.loci_names, vec!["a", "c"]);
        assert_eq!(removed.samples[0].alleles, vec!["1", "3"]);

        let kept = m.remove_loci(&remove, true);
        assert_eq!(kept.loci_names, vec!["b"]);
        assert_eq!(kept.samples[0].alleles, vec!["2"]);
    }

    #[test]
    fn test_presence_counts() {
        let m = matrix(
            &["a", "b"],
            &[("g1", &["1", "LNF"]), ("g2", &["INF-4", "2"]), ("g3", &["ASM", "2"])],
        );
        let pa = m.masked().presence_absence();
        assert_eq!(pa.samples[1].alleles, vec!["1", "1"]);
        assert_eq!(pa.locus_presence(3), vec![2, 2]);
        assert_eq!(pa.locus_presence(1), vec![1, 0]);
        assert_eq!(m.masked().missing_per_sample(), vec![1, 0, 1]);
    }

    #[test]
    fn test_join_union_and_common() {
        let m1 = matrix(&["a", "b"], &[("g1", &["1", "2"])]);
        let m2 = matrix(&["b", "c"], &[("g2", &["3", "4"])]);

        let union = AllelicMatrix::join(&[m1.clone(), m2.clone()], false).unwrap();
        assert_eq!(union.loci_names, vec!["a", "b", "c"]);
        assert_eq!(union.samples[0].alleles, vec!["1", "2", "LNF"]);
        assert_eq!(union.samples[1].alleles, vec!["LNF", "3", "4"]);

        let common = AllelicMatrix::join(&[m1.clone(), m2], true).unwrap();
        assert_eq!(common.loci_names, vec!["b"]);
        assert_eq!(common.samples[1].alleles, vec!["3"]);

        let m3 = matrix(&["z"], &[("g3", &["1"])]);
        assert!(AllelicMatrix::join(&[m1.clone(), m3], true).is_err());
        assert!(AllelicMatrix::join(&[m1], false).is_err());
    }

    #[test]
    fn test_tsv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.tsv");
        let m = matrix(&["a", "b"], &[("g1", &["1", "INF-2"]), ("g2", &["LNF", "3"])]);
        m.to_tsv(&path).unwrap();
        assert_eq!(AllelicMatrix::from_tsv(&path).unwrap(), m);
    }
}
