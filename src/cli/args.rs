// args.rs - Command line arguments definition

use argh::FromArgs;

use crate::cli::validation::{
    parse_bsr, parse_minimum_length, parse_prediction_mode, parse_size_threshold,
    parse_threshold, parse_translation_table,
};
use crate::core::PredictionMode;

#[derive(FromArgs)]
/// chewBBACA - BSR-Based Allele Calling Algorithm
pub struct Args {
    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// print the version and exit
    #[argh(switch, short = 'v')]
    pub version: bool,

    #[argh(subcommand)]
    pub command: Option<Command>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
pub enum Command {
    CreateSchema(CreateSchemaArgs),
    AlleleCall(AlleleCallArgs),
    ExtractCgMLST(ExtractCgmlstArgs),
    RemoveGenes(RemoveGenesArgs),
    JoinProfiles(JoinProfilesArgs),
    PrepExternalSchema(PrepExternalSchemaArgs),
    SchemaEvaluator(SchemaEvaluatorArgs),
    GenerateConfig(GenerateConfigArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "CreateSchema")]
/// create a gene-by-gene schema from genome assemblies or CDS files
pub struct CreateSchemaArgs {
    /// directory with FASTA files or a file listing their paths
    #[argh(option, short = 'i')]
    pub input_files: Option<String>,

    /// directory where the schema directory will be created
    #[argh(option, short = 'o')]
    pub output_directory: Option<String>,

    /// name given to the schema folder (default: schema_seed)
    #[argh(option, short = 'n')]
    pub schema_name: Option<String>,

    /// gene prediction training file
    #[argh(option)]
    pub training_file: Option<String>,

    /// BLAST Score Ratio value (default: 0.6)
    #[argh(option, long = "bsr", from_str_fn(parse_bsr))]
    pub blast_score_ratio: Option<f64>,

    /// minimum sequence length in nucleotides (default: 201)
    #[argh(option, short = 'l', from_str_fn(parse_minimum_length))]
    pub minimum_length: Option<usize>,

    /// genetic code used to translate coding sequences (default: 11)
    #[argh(option, short = 't', from_str_fn(parse_translation_table))]
    pub translation_table: Option<u8>,

    /// allele size variation threshold (default: 0.2)
    #[argh(option, from_str_fn(parse_size_threshold))]
    pub size_threshold: Option<f64>,

    /// store no size threshold in the schema config
    #[argh(switch)]
    pub no_size_threshold: bool,

    /// minimizer k-mer size for clustering (default: 5)
    #[argh(option)]
    pub word_size: Option<usize>,

    /// minimizer window size for clustering (default: 5)
    #[argh(option)]
    pub window_size: Option<usize>,

    /// minimizer similarity to add a protein to a cluster (default: 0.2)
    #[argh(option, from_str_fn(parse_threshold))]
    pub clustering_sim: Option<f64>,

    /// similarity above which cluster members are excluded (default: 0.9)
    #[argh(option, from_str_fn(parse_threshold))]
    pub representative_filter: Option<f64>,

    /// similarity above which members of the same cluster are excluded (default: 0.9)
    #[argh(option, from_str_fn(parse_threshold))]
    pub intra_filter: Option<f64>,

    /// number of CPU cores to use (default: 1)
    #[argh(option, long = "cpu")]
    pub cpu_cores: Option<usize>,

    /// gene prediction mode: single, meta (default: single)
    #[argh(option, long = "prodigal-mode", from_str_fn(parse_prediction_mode))]
    pub prediction_mode: Option<PredictionMode>,

    /// inputs are FASTA files with coding sequences
    #[argh(switch, long = "cds")]
    pub cds_input: bool,

    /// keep intermediate files
    #[argh(switch)]
    pub no_cleanup: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "AlleleCall")]
/// determine the allelic profiles of a set of genomes
pub struct AlleleCallArgs {
    /// directory with FASTA files or a file listing their paths
    #[argh(option, short = 'i')]
    pub input_files: Option<String>,

    /// path to the schema directory
    #[argh(option, short = 'g')]
    pub schema_directory: Option<String>,

    /// output directory for the results
    #[argh(option, short = 'o')]
    pub output_directory: Option<String>,

    /// gene prediction training file (default: schema training file)
    #[argh(option)]
    pub training_file: Option<String>,

    /// file with the loci to call, one per line
    #[argh(option)]
    pub genes_list: Option<String>,

    /// BLAST Score Ratio value (default: schema value)
    #[argh(option, long = "bsr", from_str_fn(parse_bsr))]
    pub blast_score_ratio: Option<f64>,

    /// minimum sequence length in nucleotides (default: schema value)
    #[argh(option, short = 'l', from_str_fn(parse_minimum_length))]
    pub minimum_length: Option<usize>,

    /// genetic code (default: schema value)
    #[argh(option, short = 't', from_str_fn(parse_translation_table))]
    pub translation_table: Option<u8>,

    /// allele size variation threshold (default: schema value)
    #[argh(option, from_str_fn(parse_size_threshold))]
    pub size_threshold: Option<f64>,

    /// number of CPU cores to use (default: 1)
    #[argh(option, long = "cpu")]
    pub cpu_cores: Option<usize>,

    /// gene prediction mode: single, meta (default: single)
    #[argh(option, long = "prodigal-mode", from_str_fn(parse_prediction_mode))]
    pub prediction_mode: Option<PredictionMode>,

    /// inputs are FASTA files with coding sequences
    #[argh(switch, long = "cds")]
    pub cds_input: bool,

    /// do not add inferred alleles to the schema
    #[argh(switch)]
    pub no_inferred: bool,

    /// write the sequences that were not classified
    #[argh(switch)]
    pub output_unclassified: bool,

    /// write the sequences classified as NIPH, NIPHEM, ASM, ALM, PLOT3, PLOT5, LOTSC and PAMA
    #[argh(switch)]
    pub output_missing: bool,

    /// write the novel alleles
    #[argh(switch)]
    pub output_novel: bool,

    /// keep intermediate files
    #[argh(switch)]
    pub no_cleanup: bool,

    /// write profiles with allele hashes: crc32, md5, sha256
    #[argh(option)]
    pub hash_profiles: Option<String>,

    /// continue when arguments differ from the schema config
    #[argh(switch)]
    pub force_continue: bool,

    /// execution mode: 1 exact DNA, 2 exact protein, 3 minimizer BSR, 4 full BSR (default: 4)
    #[argh(option)]
    pub mode: Option<u8>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "ExtractCgMLST")]
/// determine the loci that constitute the core genome
pub struct ExtractCgmlstArgs {
    /// allelic profiles matrix
    #[argh(option, short = 'i')]
    pub input_file: String,

    /// output directory
    #[argh(option, short = 'o')]
    pub output_directory: String,

    /// file with loci to exclude
    #[argh(option)]
    pub genes2remove: Option<String>,

    /// file with genomes to exclude
    #[argh(option)]
    pub genomes2remove: Option<String>,

    /// loci presence thresholds, may be repeated (default: 0.95, 0.99, 1)
    #[argh(option, short = 'p', from_str_fn(parse_threshold))]
    pub threshold: Vec<f64>,

    /// genomes added at each point of the loci curve (default: 1)
    #[argh(option, default = "1")]
    pub step: usize,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "RemoveGenes")]
/// remove loci from a matrix with allelic profiles
pub struct RemoveGenesArgs {
    /// allelic profiles matrix
    #[argh(option, short = 'i')]
    pub input_file: String,

    /// file with the loci to remove
    #[argh(option, short = 'g')]
    pub genes_list: String,

    /// output matrix file
    #[argh(option, short = 'o')]
    pub output_file: String,

    /// keep only the listed loci
    #[argh(switch)]
    pub inverse: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "JoinProfiles")]
/// join allelic profiles from several AlleleCall runs
pub struct JoinProfilesArgs {
    /// allelic profiles matrices, at least two
    #[argh(option, short = 'p')]
    pub profiles: Vec<String>,

    /// output matrix file
    #[argh(option, short = 'o')]
    pub output_file: String,

    /// keep only the loci shared by all matrices
    #[argh(switch)]
    pub common: bool,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "PrepExternalSchema")]
/// adapt an external schema with one FASTA file per locus
pub struct PrepExternalSchemaArgs {
    /// directory with the locus FASTA files or a file listing their paths
    #[argh(option, short = 'i')]
    pub input_files: Option<String>,

    /// output directory for the adapted schema
    #[argh(option, short = 'o')]
    pub output_directory: Option<String>,

    /// gene prediction training file to include in the schema
    #[argh(option)]
    pub training_file: Option<String>,

    /// BLAST Score Ratio value (default: 0.6)
    #[argh(option, long = "bsr", from_str_fn(parse_bsr))]
    pub blast_score_ratio: Option<f64>,

    /// minimum sequence length in nucleotides (default: 0)
    #[argh(option, short = 'l', from_str_fn(parse_minimum_length))]
    pub minimum_length: Option<usize>,

    /// genetic code (default: 11)
    #[argh(option, short = 't', from_str_fn(parse_translation_table))]
    pub translation_table: Option<u8>,

    /// allele size variation threshold (default: 0.2)
    #[argh(option, from_str_fn(parse_size_threshold))]
    pub size_threshold: Option<f64>,

    /// exclude alleles outside the minimum length and size threshold
    #[argh(switch)]
    pub size_filter: bool,

    /// number of CPU cores to use (default: 1)
    #[argh(option, long = "cpu")]
    pub cpu_cores: Option<usize>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "SchemaEvaluator")]
/// report allele length and validity statistics for a schema
pub struct SchemaEvaluatorArgs {
    /// path to the schema directory
    #[argh(option, short = 'g')]
    pub schema_directory: String,

    /// output directory for the report
    #[argh(option, short = 'o')]
    pub output_directory: String,

    /// file with the loci to evaluate, one per line
    #[argh(option)]
    pub genes_list: Option<String>,

    /// genetic code (default: schema value)
    #[argh(option, short = 't', from_str_fn(parse_translation_table))]
    pub translation_table: Option<u8>,

    /// minimum sequence length in nucleotides (default: schema value)
    #[argh(option, short = 'l', from_str_fn(parse_minimum_length))]
    pub minimum_length: Option<usize>,

    /// allele size variation threshold (default: schema value)
    #[argh(option, from_str_fn(parse_size_threshold))]
    pub size_threshold: Option<f64>,

    /// number of CPU cores to use (default: 1)
    #[argh(option, long = "cpu")]
    pub cpu_cores: Option<usize>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "GenerateConfig")]
/// print a sample configuration file
pub struct GenerateConfigArgs {}

impl Command {
    /// CPU cores requested by the subcommand
    pub fn cpu_cores(&self) -> Option<usize> {
        match self {
            Command::CreateSchema(a) => a.cpu_cores,
            Command::AlleleCall(a) => a.cpu_cores,
            Command::PrepExternalSchema(a) => a.cpu_cores,
            Command::SchemaEvaluator(a) => a.cpu_cores,
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateSchema(_) => "CreateSchema",
            Command::AlleleCall(_) => "AlleleCall",
            Command::ExtractCgMLST(_) => "ExtractCgMLST",
            Command::RemoveGenes(_) => "RemoveGenes",
            Command::JoinProfiles(_) => "JoinProfiles",
            Command::PrepExternalSchema(_) => "PrepExternalSchema",
            Command::SchemaEvaluator(_) => "SchemaEvaluator",
            Command::GenerateConfig(_) => "GenerateConfig",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_schema_flag_names() {
        let args = Args::from_args(
            &["chewbbaca"],
            &[
                "CreateSchema", "-i", "genomes", "-o", "out", "--bsr", "0.7", "--cpu", "2",
                "--prodigal-mode", "meta", "--cds",
            ],
        )
        .unwrap();
        match args.command {
            Some(Command::CreateSchema(a)) => {
                assert_eq!(a.blast_score_ratio, Some(0.7));
                assert_eq!(a.cpu_cores, Some(2));
                assert_eq!(a.prediction_mode, Some(PredictionMode::Meta));
                assert!(a.cds_input);
            }
            _ => panic!("expected CreateSchema"),
        }
    }

    #[test]
    fn test_invalid_bsr_rejected() {
        let result = Args::from_args(&["chewbbaca"], &["AlleleCall", "--bsr", "1.5"]);
        assert!(result.is_err());
    }
}
