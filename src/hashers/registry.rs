// registry.rs - Hasher registry for hashed profile output

use std::collections::BTreeMap;

use super::traits::AlleleHasher;
use super::{Crc32Hasher, Md5Hasher, Sha256Hasher};

/// Hashers available to `--hash-profiles`, keyed by lowercase name
pub struct HasherRegistry {
    hashers: BTreeMap<String, Box<dyn AlleleHasher>>,
}

impl HasherRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            hashers: BTreeMap::new(),
        };

        registry.register_hasher("crc32", Box::new(Crc32Hasher));
        registry.register_hasher("sha256", Box::new(Sha256Hasher));
        registry.register_hasher("md5", Box::new(Md5Hasher));

        registry
    }

    pub fn register_hasher(&mut self, name: &str, hasher: Box<dyn AlleleHasher>) {
        self.hashers.insert(name.to_lowercase(), hasher);
    }

    /// Get a hasher by name, ignoring case
    pub fn get_hasher(&self, name: &str) -> Option<&dyn AlleleHasher> {
        self.hashers.get(&name.to_lowercase()).map(|h| h.as_ref())
    }

    pub fn has_hasher(&self, name: &str) -> bool {
        self.hashers.contains_key(&name.to_lowercase())
    }

    pub fn get_hasher_names(&self) -> Vec<&str> {
        self.hashers.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for HasherRegistry {
    fn default() -> Self {
        Self::new()
    }
}
