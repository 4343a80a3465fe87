// mod.rs - Hashers module root

pub mod crc32;
pub mod md5;
pub mod registry;
pub mod sha256;
pub mod traits;

// Re-export main types for convenience
pub use crc32::Crc32Hasher;
pub use md5::Md5Hasher;
pub use registry::HasherRegistry;
pub use sha256::Sha256Hasher;
pub use traits::{AlleleHash, AlleleHasher};
