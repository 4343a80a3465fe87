// tsv.rs - TSV file loader for allelic profiles

use crate::data::profile::{AllelicMatrix, AllelicProfile};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

impl AllelicMatrix {
    /// Load a `FILE` headed profile matrix
    pub fn from_tsv(file_path: &Path) -> Result<Self, String> {
        let file = File::open(file_path).map_err(|e| {
            format!("Failed to open TSV file {}: {}", file_path.display(), e)
        })?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        // Read header
        let header_line = lines
            .next()
            .ok_or("Empty TSV file")?
            .map_err(|e| format!("Failed to read header: {}", e))?;

        let header_parts: Vec<&str> = header_line.trim_end_matches('\r').split('\t').collect();
        if header_parts.len() < 2 {
            return Err("TSV header must have at least 2 columns".to_string());
        }

        let loci_names: Vec<String> = header_parts[1..].iter().map(|s| s.to_string()).collect();
        let mut samples = Vec::new();

        for (line_num, line) in lines.enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 2, e))?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();

            if parts.len() != header_parts.len() {
                return Err(format!(
                    "Line {} has {} columns, expected {}",
                    line_num + 2,
                    parts.len(),
                    header_parts.len()
                ));
            }

            samples.push(AllelicProfile {
                sample_id: parts[0].to_string(),
                alleles: parts[1..].iter().map(|s| s.trim().to_string()).collect(),
            });
        }

        log::info!(
            "Loaded {}: {} samples, {} loci",
            file_path.display(),
            samples.len(),
            loci_names.len()
        );
        Ok(Self {
            samples,
            loci_names,
        })
    }
}

/// Identifiers listed one per line, blank lines ignored
pub fn read_id_list(file_path: &Path) -> Result<HashSet<String>, String> {
    let file = File::open(file_path)
        .map_err(|e| format!("Failed to open list {}: {}", file_path.display(), e))?;
    let mut ids = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| format!("Failed to read {}: {}", file_path.display(), e))?;
        let id = line.trim();
        if !id.is_empty() {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}
