// sequence.rs - FASTA records, coding sequences and input file handling

use bio::io::fasta;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::core::constants::FASTA_EXTENSIONS;

/// A single FASTA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(id: impl Into<String>, sequence: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            sequence,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Coding sequence found in (or provided for) an input genome
#[derive(Debug, Clone)]
pub struct CodingSequence {
    /// `<genome prefix>-protein<N>`
    pub id: String,
    pub genome: usize,
    pub contig: String,
    /// 1-based inclusive coordinates on the contig
    pub start: usize,
    pub stop: usize,
    /// 1 for the forward strand, -1 for the reverse strand
    pub strand: i8,
    pub dna: Vec<u8>,
}

impl CodingSequence {
    /// Compact location string used in the contig info report
    pub fn location(&self) -> String {
        format!("{}&{}-{}&{}", self.contig, self.start, self.stop, self.strand)
    }
}

/// Read all records from a FASTA file, uppercasing sequences
pub fn read_fasta(path: &Path) -> Result<Vec<SequenceRecord>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open FASTA file {}: {}", path.display(), e))?;
    let reader = fasta::Reader::new(BufReader::new(file));

    let mut records = Vec::new();
    for record_result in reader.records() {
        let record = record_result
            .map_err(|e| format!("Invalid FASTA record in {}: {}", path.display(), e))?;
        records.push(SequenceRecord {
            id: record.id().to_string(),
            sequence: record.seq().to_ascii_uppercase(),
        });
    }

    Ok(records)
}

/// Write records to a FASTA file, replacing any existing file
pub fn write_fasta(path: &Path, records: &[SequenceRecord]) -> Result<(), String> {
    let file = File::create(path)
        .map_err(|e| format!("Failed to create FASTA file {}: {}", path.display(), e))?;
    let mut writer = fasta::Writer::new(BufWriter::new(file));
    for record in records {
        writer
            .write(&record.id, None, &record.sequence)
            .map_err(|e| format!("Failed to write FASTA record to {}: {}", path.display(), e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to flush FASTA file {}: {}", path.display(), e))?;
    Ok(())
}

/// Append records to a FASTA file, creating it when missing
pub fn append_fasta(path: &Path, records: &[SequenceRecord]) -> Result<(), String> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open FASTA file {}: {}", path.display(), e))?;
    let mut writer = fasta::Writer::new(BufWriter::new(file));
    for record in records {
        writer
            .write(&record.id, None, &record.sequence)
            .map_err(|e| format!("Failed to write FASTA record to {}: {}", path.display(), e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to flush FASTA file {}: {}", path.display(), e))?;
    Ok(())
}

/// SHA-256 hex digest of a sequence
pub fn sequence_hash(sequence: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sequence);
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest of a file's contents
pub fn file_hash(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    Ok(sequence_hash(&bytes))
}

/// Check whether a file looks like a FASTA file by its first non empty line
pub fn is_fasta(path: &Path) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .find(|line| !line.trim().is_empty())
        .map(|line| line.starts_with('>'))
        .unwrap_or(false)
}

fn has_fasta_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FASTA_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Resolve input FASTA files from a directory or from a file listing one path
/// per line. Paths are sorted case-insensitively by file name.
pub fn resolve_input_files(input: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files: Vec<PathBuf> = if input.is_dir() {
        let entries = std::fs::read_dir(input)
            .map_err(|e| format!("Failed to read input directory {}: {}", input.display(), e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| format!("Failed to read directory entry: {}", e))?
                .path();
            if path.is_file() && has_fasta_extension(&path) && is_fasta(&path) {
                paths.push(path);
            }
        }
        paths
    } else if input.is_file() {
        let file = File::open(input)
            .map_err(|e| format!("Failed to open input list {}: {}", input.display(), e))?;
        let mut paths = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| format!("Failed to read input list: {}", e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let path = PathBuf::from(trimmed);
            if !path.is_file() {
                return Err(format!("Input file does not exist: {}", trimmed));
            }
            if !is_fasta(&path) {
                return Err(format!("Input file is not a FASTA file: {}", trimmed));
            }
            paths.push(path);
        }
        paths
    } else {
        return Err(format!("Input path does not exist: {}", input.display()));
    };

    if files.is_empty() {
        return Err(format!(
            "Could not find any valid FASTA files in {}",
            input.display()
        ));
    }

    files.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

/// File name up to the first `.`
pub fn file_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Unique prefix for each input file. Errors list every repeated prefix.
pub fn unique_prefixes(files: &[PathBuf]) -> Result<Vec<String>, String> {
    let prefixes: Vec<String> = files.iter().map(|f| file_prefix(f)).collect();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for prefix in &prefixes {
        *counts.entry(prefix.as_str()).or_default() += 1;
    }

    let repeated: Vec<String> = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(prefix, count)| format!("{}: {}", prefix, count))
        .collect();
    if !repeated.is_empty() {
        return Err(format!(
            "Found {} input files with repeated prefixes. Please make sure file names have unique prefixes:\n{}",
            repeated.len(),
            repeated.join("\n")
        ));
    }

    Ok(prefixes)
}
