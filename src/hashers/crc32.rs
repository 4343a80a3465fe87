// crc32.rs - CRC32 hasher implementation

use super::traits::{normalized, AlleleHash, AlleleHasher};

/// CRC32 checksum of the allele DNA
#[derive(Debug, Clone)]
pub struct Crc32Hasher;

impl AlleleHasher for Crc32Hasher {
    fn hash_sequence(&self, sequence: &[u8]) -> AlleleHash {
        use crc32fast::Hasher;
        let mut hasher = Hasher::new();
        hasher.update(&normalized(sequence));
        AlleleHash::Crc32(hasher.finalize())
    }

    fn name(&self) -> &'static str {
        "CRC32"
    }

    fn description(&self) -> &'static str {
        "CRC32 checksum of the allele sequence"
    }
}
