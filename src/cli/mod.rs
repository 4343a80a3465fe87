// mod.rs - CLI module

pub mod args;
pub mod config;
pub mod merge;
pub mod validation;

// Re-export main types for convenience
pub use args::{Args, Command};
pub use config::Config;
pub use validation::{
    resolve_cpu_cores, validate_allele_call, validate_create_schema, validate_prep_schema,
};
