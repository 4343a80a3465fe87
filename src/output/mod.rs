// mod.rs - Output writers and progress reporting

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::constants::CDS_TABLE_HEADER;
use crate::core::prediction::GenomeCds;

/// Ensure parent directory exists before creating file
pub fn ensure_parent_dir(file_path: &Path) -> Result<(), String> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| {
                format!("Failed to create parent directory '{}': {}", parent.display(), e)
            })?;
        }
    }
    Ok(())
}

/// Progress bar in the style used by every long running step
pub fn progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {}",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Write a tab separated table with a header row
pub fn write_table(file_path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<(), String> {
    ensure_parent_dir(file_path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .flexible(true)
        .from_path(file_path)
        .map_err(|e| format!("Failed to create output file '{}': {}", file_path.display(), e))?;

    writer
        .write_record(header)
        .map_err(|e| format!("Write error: {}", e))?;
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| format!("Write error: {}", e))?;
    }
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    log::debug!("Wrote {} rows to {}", rows.len(), file_path.display());
    Ok(())
}

/// Write one line per entry
pub fn write_lines(file_path: &Path, lines: &[String]) -> Result<(), String> {
    ensure_parent_dir(file_path)?;
    let file = File::create(file_path)
        .map_err(|e| format!("Failed to create output file '{}': {}", file_path.display(), e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line).map_err(|e| format!("Write error: {}", e))?;
    }
    writer.flush().map_err(|e| format!("Flush error: {}", e))
}

/// Write the coordinates of every CDS of every genome
pub fn write_cds_coordinates(file_path: &Path, genomes: &[GenomeCds]) -> Result<(), String> {
    let header: Vec<String> = CDS_TABLE_HEADER.split('\t').map(String::from).collect();
    let rows: Vec<Vec<String>> = genomes
        .iter()
        .flat_map(|genome| {
            genome.cds.iter().map(move |cds| {
                vec![
                    genome.prefix.clone(),
                    cds.contig.clone(),
                    cds.start.to_string(),
                    cds.stop.to_string(),
                    cds.id.clone(),
                    cds.strand.to_string(),
                ]
            })
        })
        .collect();
    write_table(file_path, &header, &rows)
}

/// Write `key: value` run information with the generation time
pub fn write_run_info(file_path: &Path, entries: &[(&str, String)]) -> Result<(), String> {
    let mut lines = vec![
        format!("chewBBACA version: {}", env!("CARGO_PKG_VERSION")),
        format!(
            "Generated: {}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S")
        ),
    ];
    lines.extend(entries.iter().map(|(key, value)| format!("{}: {}", key, value)));
    write_lines(file_path, &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sequence::CodingSequence;

    #[test]
    fn test_write_table_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.tsv");
        let header = vec!["FILE".to_string(), "locus1".to_string()];
        let rows = vec![vec!["g1".to_string(), "INF-3".to_string()]];
        write_table(&path, &header, &rows).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "FILE\tlocus1\ng1\tINF-3\n");
    }

    #[test]
    fn test_cds_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cds_coordinates.tsv");
        let genomes = vec![GenomeCds {
            prefix: "g1".to_string(),
            path: dir.path().join("g1.fasta"),
            cds: vec![CodingSequence {
                id: "g1-protein1".to_string(),
                genome: 0,
                contig: "c1".to_string(),
                start: 10,
                stop: 99,
                strand: -1,
                dna: Vec::new(),
            }],
            contig_lengths: None,
        }];
        write_cds_coordinates(&path, &genomes).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], CDS_TABLE_HEADER);
        assert_eq!(lines[1], "g1\tc1\t10\t99\tg1-protein1\t-1");
    }

    #[test]
    fn test_run_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging_info.txt");
        write_run_info(&path, &[("Number of inputs", "3".to_string())]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Number of inputs: 3"));
    }
}
