use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

/// Generated script bodies keyed by the SHA-256 of their inputs.
///
/// Lives across render passes; whether a cached body is actually emitted is
/// still decided per pass by the render guard.
#[derive(Debug, Default, Clone)]
pub struct ScriptCache {
    entries: HashMap<String, String>,
    hits: usize,
    misses: usize,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            // Separator so ("ab", "c") and ("a", "bc") differ.
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, hash: &str) -> Option<&str> {
        self.entries.get(hash).map(String::as_str)
    }

    pub fn get_or_insert_with<F>(&mut self, parts: &[&str], generate: F) -> String
    where
        F: FnOnce() -> String,
    {
        let hash = Self::compute_hash(parts);
        if let Some(body) = self.entries.get(&hash) {
            self.hits += 1;
            debug!(%hash, "script cache hit");
            return body.clone();
        }
        self.misses += 1;
        debug!(%hash, "script cache miss");
        let body = generate();
        self.entries.insert(hash, body.clone());
        body
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
