// mod.rs - Data structures module

pub mod loaders;
pub mod profile;
pub mod schema;
pub mod sequence;

// Re-export main types for convenience
pub use profile::{AllelicMatrix, AllelicProfile};
pub use schema::{Schema, SchemaConfig};
pub use sequence::{CodingSequence, SequenceRecord};
