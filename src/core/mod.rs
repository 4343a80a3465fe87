// mod.rs - Core logic module

pub mod alignment;
pub mod allele_call;
pub mod bsr;
pub mod cgmlst;
pub mod clustering;
pub mod constants;
pub mod create_schema;
pub mod dedup;
pub mod evaluate;
pub mod minimizers;
pub mod prediction;
pub mod prep_schema;
pub mod profiles;
pub mod translation;

// Re-export main types for convenience
pub use alignment::{blast_score_ratio, AlignmentConfig, ProteinAligner};
pub use allele_call::{AlleleCallParams, AlleleCallSummary, LocusClass};
pub use cgmlst::CgmlstParams;
pub use clustering::{Cluster, ClusteringConfig};
pub use create_schema::{CreateSchemaParams, CreateSchemaSummary};
pub use evaluate::{EvaluateParams, LocusReport};
pub use prediction::{GenomeCds, PredictionMode};
pub use prep_schema::PrepSchemaParams;
pub use profiles::{join_profiles, remove_genes};
pub use translation::{GeneticCode, TranslationError};
