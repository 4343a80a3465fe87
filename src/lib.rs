// lib.rs - chewbbaca library root

//! # chewbbaca - BSR-Based Allele Calling Algorithm
//!
//! Creation of whole genome and core genome MLST schemas and allele calling
//! for bacterial genomes. Coding sequences are compared at the protein level
//! with the BLAST Score Ratio (BSR): the alignment score of a query against
//! a representative allele divided by the representative's self score.
//!
//! ## Features
//!
//! - **CreateSchema**: gene prediction, deduplication, minimizer clustering
//!   and BSR filtering to build a schema seed
//! - **AlleleCall**: exact DNA and protein matches, minimizer guided and
//!   iterative BSR searches, locus classification and schema updates
//! - **ExtractCgMLST**, **RemoveGenes**, **JoinProfiles**: profile matrix
//!   utilities
//! - **PrepExternalSchema** and **SchemaEvaluator**: adapt and report on
//!   schemas from other sources
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use chewbbaca::prelude::*;
//! use std::path::PathBuf;
//!
//! let params = AlleleCallParams {
//!     input_files: PathBuf::from("genomes"),
//!     schema_directory: PathBuf::from("schema_seed"),
//!     output_directory: PathBuf::from("results"),
//!     ..Default::default()
//! };
//! let summary = chewbbaca::core::allele_call::run(&params)?;
//! println!("{} novel alleles", summary.novel_alleles);
//!
//! let matrix = AllelicMatrix::from_tsv(&summary.output_directory.join("results_alleles.tsv"))?;
//! matrix.print_matrix_statistics("RESULTS");
//! # Ok::<(), String>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod hashers;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{Args, Command, Config};
    pub use crate::core::{AlignmentConfig, GeneticCode, LocusClass, PredictionMode};
    pub use crate::core::{AlleleCallParams, CgmlstParams, CreateSchemaParams, PrepSchemaParams};
    pub use crate::data::{AllelicMatrix, AllelicProfile, Schema, SchemaConfig, SequenceRecord};
    pub use crate::hashers::{AlleleHash, AlleleHasher, HasherRegistry};
}

// Re-export main types at the root level for convenience
pub use cli::Args;
pub use core::{AlignmentConfig, AlleleCallParams, CreateSchemaParams, GeneticCode};
pub use data::{AllelicMatrix, AllelicProfile, Schema, SchemaConfig};
pub use hashers::{AlleleHash, AlleleHasher, HasherRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
