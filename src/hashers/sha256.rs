// sha256.rs - SHA256 hasher implementation

use super::traits::{normalized, AlleleHash, AlleleHasher};

/// SHA256 digest of the allele DNA
#[derive(Debug, Clone)]
pub struct Sha256Hasher;

impl AlleleHasher for Sha256Hasher {
    fn hash_sequence(&self, sequence: &[u8]) -> AlleleHash {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(normalized(sequence));
        AlleleHash::Hex(format!("{:x}", hasher.finalize()))
    }

    fn name(&self) -> &'static str {
        "SHA256"
    }

    fn description(&self) -> &'static str {
        "SHA256 digest of the allele sequence"
    }
}
