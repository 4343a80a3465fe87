// mod.rs - File loaders for profile matrices and id lists

pub mod tsv;

// Re-export main types for convenience
pub use tsv::read_id_list;
