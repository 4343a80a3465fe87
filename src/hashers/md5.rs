// md5.rs - MD5 hasher implementation

use super::traits::{normalized, AlleleHash, AlleleHasher};

/// MD5 digest of the allele DNA
#[derive(Debug, Clone)]
pub struct Md5Hasher;

impl AlleleHasher for Md5Hasher {
    fn hash_sequence(&self, sequence: &[u8]) -> AlleleHash {
        let digest = md5::compute(normalized(sequence));
        AlleleHash::Hex(format!("{:x}", digest))
    }

    fn name(&self) -> &'static str {
        "MD5"
    }

    fn description(&self) -> &'static str {
        "MD5 digest of the allele sequence"
    }
}
