// constants.rs - Default parameters and fixed file names

/// Default BLAST Score Ratio
pub const DEFAULT_BSR: f64 = 0.6;

/// Default minimum CDS length used by CreateSchema
pub const MINIMUM_LENGTH_DEFAULT: usize = 201;

/// Minimum length stored in configs of adapted schemas
pub const MSL_MIN: usize = 0;

/// Default genetic code
pub const TRANSLATION_TABLE_DEFAULT: u8 = 11;

/// Default allele size variation threshold
pub const SIZE_THRESHOLD_DEFAULT: f64 = 0.2;

// Minimizer clustering
pub const WORD_SIZE_DEFAULT: usize = 5;
pub const WINDOW_SIZE_DEFAULT: usize = 5;
pub const CLUSTERING_SIMILARITY_DEFAULT: f64 = 0.2;
pub const REPRESENTATIVE_FILTER_DEFAULT: f64 = 0.9;
pub const INTRA_CLUSTER_DEFAULT: f64 = 0.9;

/// Default loci presence thresholds for ExtractCgMLST
pub const CGMLST_THRESHOLDS: [f64; 3] = [0.95, 0.99, 1.0];

/// Added to the BSR to decide if a match is represented well enough
pub const BSR_REPRESENTATIVE_MARGIN: f64 = 0.1;

/// Minimum ORF length accepted by the gene finder
pub const MIN_ORF_LENGTH: usize = 90;

/// Maximum overlap between accepted ORFs
pub const MAX_ORF_OVERLAP: usize = 60;

/// Minimum total input length for single mode gene prediction
pub const SINGLE_MODE_MIN_LENGTH: usize = 20_000;

/// Seed size used to select candidate pairs for alignment
pub const SEED_SIZE: usize = 4;

/// Minimum number of distinct shared seeds for a candidate pair
pub const MIN_SHARED_SEEDS: usize = 2;

pub const GENOME_LIST: &str = "listGenomes.txt";
pub const LOCI_LIST: &str = "listGenes.txt";
pub const CDS_COORDINATES_BASENAME: &str = "cds_coordinates.tsv";
pub const CDS_TABLE_HEADER: &str = "Genome\tContig\tStart\tStop\tProtein_ID\tCoding_Strand";
pub const INVALID_CDS_BASENAME: &str = "invalid_cds.txt";
pub const GENE_PREDICTION_FAILURES: &str = "gene_prediction_failures.tsv";

// Schema files
pub const SCHEMA_CONFIG: &str = ".schema_config";
pub const GENES_LIST: &str = ".genes_list";
pub const SHORT_DIR: &str = "short";
pub const SELF_SCORES: &str = "self_scores";
pub const PRE_COMPUTED_DIR: &str = "pre_computed";
pub const HASH_TABLES: &str = "hash_tables";

/// Replacements applied to sequence ids before they become locus ids
pub const CHAR_REPLACEMENTS: [(&str, &str); 7] = [
    ("|", "_"),
    ("_", "-"),
    ("(", ""),
    (")", ""),
    ("'", ""),
    ("\"", ""),
    (":", ""),
];

/// Accepted FASTA file extensions
pub const FASTA_EXTENSIONS: [&str; 6] = ["fasta", "fna", "ffn", "fa", "fas", "fsa"];

pub const AUTHORS: &str = "Rafael Mamede, Pedro Cerqueira, Mickael Silva, João Carriço, Mário Ramirez";
pub const REPOSITORY: &str = "https://github.com/B-UMMI/chewBBACA";
pub const DOCUMENTATION: &str = "https://chewbbaca.readthedocs.io/en/latest/index.html";
pub const CONTACTS: &str = "imm-bioinfo@medicina.ulisboa.pt";

pub const SCHEMA_PATH_MISSING: &str =
    "Path to input schema does not exist. Please provide a valid path.";
pub const SCHEMA_INVALID_PATH: &str =
    "Provided path does not include all the necessary schema files. Please verify that you have passed the correct path to the schema.";
pub const ADAPT_LEGACY_SCHEMA: &str =
    "Schema does not have a config file. Please adapt it with the PrepExternalSchema module or pass --force-continue to use default parameters.";
pub const OUTPUT_DIRECTORY_EXISTS: &str =
    "Output directory already exists. Please provide a path to a directory that will be created to store the results.";
