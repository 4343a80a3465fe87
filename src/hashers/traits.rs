// traits.rs - Core traits and types for the hasher system

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// Hash of an allele sequence as written into hashed profiles
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlleleHash {
    /// CRC32 checksum (u32)
    Crc32(u32),
    /// Hex digest (SHA256, MD5)
    Hex(String),
}

impl Display for AlleleHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlleleHash::Crc32(val) => write!(f, "{}", val),
            AlleleHash::Hex(s) => write!(f, "{}", s),
        }
    }
}

/// Strategy used to replace allele identifiers by sequence hashes
pub trait AlleleHasher: Send + Sync + Debug {
    /// Hash a DNA sequence. Case is ignored.
    fn hash_sequence(&self, sequence: &[u8]) -> AlleleHash;

    /// Get a human-readable name for this hasher
    fn name(&self) -> &'static str;

    /// Get a description of this hasher
    fn description(&self) -> &'static str;
}

pub(crate) fn normalized(sequence: &[u8]) -> Vec<u8> {
    sequence.to_ascii_uppercase()
}
