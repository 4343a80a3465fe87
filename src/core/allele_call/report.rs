// report.rs - AlleleCall result tables and FASTA outputs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::core::allele_call::classify::{Classification, LocusClass, LocusHit, CLASS_LABELS};
use crate::core::dedup::DistinctSequence;
use crate::data::schema::Schema;
use crate::data::sequence::{write_fasta, CodingSequence, SequenceRecord};
use crate::hashers::AlleleHasher;
use crate::output::{write_lines, write_table};

pub const RESULTS_ALLELES: &str = "results_alleles.tsv";
pub const RESULTS_ALLELES_HASHED: &str = "results_alleles_hashed.tsv";
pub const RESULTS_STATISTICS: &str = "results_statistics.tsv";
pub const RESULTS_CONTIGS_INFO: &str = "results_contigsInfo.tsv";
pub const LOCI_SUMMARY_STATS: &str = "loci_summary_stats.tsv";
pub const PARALOGOUS_COUNTS: &str = "paralogous_counts.tsv";
pub const PARALOGOUS_LOCI: &str = "paralogous_loci.tsv";
pub const NOVEL_ALLELES: &str = "novel_alleles.fasta";
pub const UNCLASSIFIED_SEQUENCES: &str = "unclassified_sequences.fasta";
pub const MISSING_CLASSES_FASTA: &str = "missing_classes.fasta";
pub const MISSING_CLASSES_TSV: &str = "missing_classes.tsv";

/// Classes reported in the missing classes outputs
const MISSING_CLASSES: [&str; 8] = ["NIPH", "NIPHEM", "ASM", "ALM", "PLOT3", "PLOT5", "LOTSC", "PAMA"];

/// Everything an AlleleCall run knows about its inputs once classified
pub struct CallResults<'a> {
    pub schema: &'a Schema,
    pub genome_names: Vec<String>,
    pub all_cds: Vec<CodingSequence>,
    /// CDS indices of each genome
    pub genome_cds: Vec<Vec<usize>>,
    /// Distinct sequence index of each CDS
    pub cds_distinct: Vec<usize>,
    pub distinct: Vec<DistinctSequence>,
    /// Coding orientation DNA for distinct sequences given as reverse complement
    pub coding: HashMap<usize, Vec<u8>>,
    pub hits: Vec<Vec<LocusHit>>,
    /// Distinct sequences that could not be translated
    pub invalid: BTreeSet<usize>,
    pub classification: Classification,
}

fn header(first: &str, rest: impl IntoIterator<Item = String>) -> Vec<String> {
    std::iter::once(first.to_string()).chain(rest).collect()
}

impl<'a> CallResults<'a> {
    fn locus_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.schema.loci.iter().map(|l| l.id.clone())
    }

    /// DNA of a distinct sequence in coding orientation
    pub fn coding_dna(&self, distinct: usize) -> Vec<u8> {
        self.coding
            .get(&distinct)
            .cloned()
            .unwrap_or_else(|| self.distinct[distinct].sequence.clone())
    }

    /// Allelic profiles, one row per genome
    pub fn profile_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let rows: Vec<Vec<String>> = self
            .classification
            .genomes
            .iter()
            .zip(&self.genome_names)
            .map(|(call, name)| {
                std::iter::once(name.clone())
                    .chain(call.classes.iter().map(|c| c.to_string()))
                    .collect()
            })
            .collect();
        (header("FILE", self.locus_ids()), rows)
    }

    /// Class counts per genome with invalid, classified and total CDS counts
    pub fn statistics_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let columns = CLASS_LABELS
            .into_iter()
            .map(String::from)
            .chain(["Invalid CDSs", "Classified_CDSs", "Total_CDSs"].into_iter().map(String::from));

        let rows: Vec<Vec<String>> = self
            .classification
            .genomes
            .iter()
            .enumerate()
            .map(|(g, call)| {
                let mut row = vec![self.genome_names[g].clone()];
                for label in CLASS_LABELS {
                    let count = call.classes.iter().filter(|c| c.label() == label).count();
                    row.push(count.to_string());
                }
                let invalid = self.genome_cds[g]
                    .iter()
                    .filter(|c| self.invalid.contains(&self.cds_distinct[**c]))
                    .count();
                let classified = call.classes.iter().filter(|c| c.is_allele()).count();
                row.push(invalid.to_string());
                row.push(classified.to_string());
                row.push(self.genome_cds[g].len().to_string());
                row
            })
            .collect();
        (header("FILE", columns), rows)
    }

    /// CDS location of each identified allele, class label otherwise
    pub fn contigs_info_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let rows: Vec<Vec<String>> = self
            .classification
            .genomes
            .iter()
            .zip(&self.genome_names)
            .map(|(call, name)| {
                let mut row = vec![name.clone()];
                for (class, matched) in call.classes.iter().zip(&call.matched) {
                    let cell = match (class.is_allele(), matched.first()) {
                        (true, Some(cds)) => self.all_cds[*cds].location(),
                        _ => class.label().to_string(),
                    };
                    row.push(cell);
                }
                row
            })
            .collect();
        (header("FILE", self.locus_ids()), rows)
    }

    /// Class counts per locus and the number of CDS matched to it
    pub fn loci_summary_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let columns = CLASS_LABELS
            .into_iter()
            .map(String::from)
            .chain(std::iter::once("Total_CDS".to_string()));

        let rows: Vec<Vec<String>> = self
            .schema
            .loci
            .iter()
            .enumerate()
            .map(|(locus, l)| {
                let mut row = vec![l.id.clone()];
                for label in CLASS_LABELS {
                    let count = self
                        .classification
                        .genomes
                        .iter()
                        .filter(|g| g.classes[locus].label() == label)
                        .count();
                    row.push(count.to_string());
                }
                let total: usize = self
                    .classification
                    .genomes
                    .iter()
                    .map(|g| g.matched[locus].len())
                    .sum();
                row.push(total.to_string());
                row
            })
            .collect();
        (header("Locus", columns), rows)
    }

    /// CDS that matched several loci: per locus counts and one row per CDS
    pub fn paralogous_rows(&self) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        let mut loci_rows = Vec::new();
        for (g, cds_list) in self.genome_cds.iter().enumerate() {
            for &cds in cds_list {
                let hits = &self.hits[self.cds_distinct[cds]];
                if hits.len() < 2 {
                    continue;
                }
                let loci: Vec<&str> = hits
                    .iter()
                    .map(|h| self.schema.loci[h.locus].id.as_str())
                    .collect();
                for hit in hits {
                    *counts.entry(hit.locus).or_default() += 1;
                }
                loci_rows.push(vec![
                    self.genome_names[g].clone(),
                    loci.join(";"),
                    self.all_cds[cds].id.clone(),
                ]);
            }
        }

        let count_rows = counts
            .into_iter()
            .map(|(locus, count)| vec![self.schema.loci[locus].id.clone(), count.to_string()])
            .collect();
        (count_rows, loci_rows)
    }

    /// CDS behind non allele classes
    pub fn missing_classes(&self) -> (Vec<Vec<String>>, Vec<SequenceRecord>) {
        let mut rows = Vec::new();
        let mut records = Vec::new();
        for (g, call) in self.classification.genomes.iter().enumerate() {
            for (locus, (class, matched)) in call.classes.iter().zip(&call.matched).enumerate() {
                if !MISSING_CLASSES.contains(&class.label()) {
                    continue;
                }
                let locus_id = &self.schema.loci[locus].id;
                for &cds in matched {
                    let c = &self.all_cds[cds];
                    rows.push(vec![
                        self.genome_names[g].clone(),
                        locus_id.clone(),
                        class.label().to_string(),
                        c.id.clone(),
                        c.contig.clone(),
                        c.start.to_string(),
                        c.stop.to_string(),
                        c.strand.to_string(),
                    ]);
                    records.push(SequenceRecord::new(
                        format!("{}|{}&{}", c.id, locus_id, class.label()),
                        self.coding_dna(self.cds_distinct[cds]),
                    ));
                }
            }
        }
        (rows, records)
    }

    /// Valid distinct sequences that matched no locus
    pub fn unclassified(&self) -> Vec<SequenceRecord> {
        self.distinct
            .iter()
            .enumerate()
            .filter(|(d, _)| self.hits[*d].is_empty() && !self.invalid.contains(d))
            .map(|(d, seq)| SequenceRecord::new(seq.id.clone(), self.coding_dna(d)))
            .collect()
    }

    /// Novel alleles grouped by locus id, as schema records
    pub fn novel_records(&self) -> BTreeMap<String, Vec<SequenceRecord>> {
        self.classification
            .novel
            .iter()
            .map(|(locus, alleles)| {
                let l = &self.schema.loci[*locus];
                let records = alleles
                    .iter()
                    .map(|(id, d)| SequenceRecord::new(l.record_id(id), self.coding_dna(*d)))
                    .collect();
                (l.id.clone(), records)
            })
            .collect()
    }

    /// Profiles with allele identifiers replaced by sequence hashes
    pub fn hashed_profile_rows(&self, hasher: &dyn AlleleHasher) -> Vec<Vec<String>> {
        let novel: Vec<(usize, &str, Vec<u8>)> = self
            .classification
            .novel
            .iter()
            .flat_map(|(locus, alleles)| {
                alleles
                    .iter()
                    .map(move |(id, d)| (*locus, id.as_str(), self.coding_dna(*d)))
            })
            .collect();
        let mut known: Vec<HashMap<&str, &[u8]>> = self
            .schema
            .loci
            .iter()
            .map(|l| {
                l.alleles
                    .iter()
                    .map(|a| (a.id.as_str(), a.sequence.as_slice()))
                    .collect()
            })
            .collect();
        for (locus, id, sequence) in &novel {
            known[*locus].insert(id, sequence.as_slice());
        }

        self.classification
            .genomes
            .iter()
            .zip(&self.genome_names)
            .map(|(call, name)| {
                let mut row = vec![name.clone()];
                for (locus, class) in call.classes.iter().enumerate() {
                    let cell = match class {
                        LocusClass::Exc(id) | LocusClass::Inf(id) => known[locus]
                            .get(id.as_str())
                            .map(|seq| hasher.hash_sequence(seq).to_string())
                            .unwrap_or_else(|| class.to_string()),
                        other => other.label().to_string(),
                    };
                    row.push(cell);
                }
                row
            })
            .collect()
    }

    /// Write the tables every run produces
    pub fn write_tables(&self, output: &Path) -> Result<(), String> {
        let (header, rows) = self.profile_rows();
        write_table(&output.join(RESULTS_ALLELES), &header, &rows)?;
        let (header, rows) = self.statistics_rows();
        write_table(&output.join(RESULTS_STATISTICS), &header, &rows)?;
        let (header, rows) = self.contigs_info_rows();
        write_table(&output.join(RESULTS_CONTIGS_INFO), &header, &rows)?;
        let (header, rows) = self.loci_summary_rows();
        write_table(&output.join(LOCI_SUMMARY_STATS), &header, &rows)?;

        let (counts, loci) = self.paralogous_rows();
        write_table(
            &output.join(PARALOGOUS_COUNTS),
            &["Locus".to_string(), "Count".to_string()],
            &counts,
        )?;
        write_table(
            &output.join(PARALOGOUS_LOCI),
            &["Genome".to_string(), "Loci".to_string(), "CDS".to_string()],
            &loci,
        )?;
        Ok(())
    }

    pub fn write_missing_classes(&self, output: &Path) -> Result<(), String> {
        let (rows, records) = self.missing_classes();
        let header: Vec<String> = [
            "Genome",
            "Locus",
            "Locus_classification",
            "CDS",
            "Contig",
            "Start",
            "Stop",
            "Coding_Strand",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        write_table(&output.join(MISSING_CLASSES_TSV), &header, &rows)?;
        write_fasta(&output.join(MISSING_CLASSES_FASTA), &records)
    }

    pub fn write_unclassified(&self, output: &Path) -> Result<(), String> {
        write_fasta(&output.join(UNCLASSIFIED_SEQUENCES), &self.unclassified())
    }

    pub fn write_novel(&self, output: &Path) -> Result<(), String> {
        let records: Vec<SequenceRecord> = self.novel_records().into_values().flatten().collect();
        write_fasta(&output.join(NOVEL_ALLELES), &records)
    }

    pub fn write_hashed_profiles(&self, output: &Path, hasher: &dyn AlleleHasher) -> Result<(), String> {
        let (header, _) = self.profile_rows();
        write_table(
            &output.join(RESULTS_ALLELES_HASHED),
            &header,
            &self.hashed_profile_rows(hasher),
        )
    }
}

/// Write the invalid CDS report
pub fn write_invalid(output: &Path, basename: &str, lines: &[String]) -> Result<(), String> {
    write_lines(&output.join(basename), lines)
}
