//! Per-run output filename registry.
//!
//! A conversion run creates one registry per output directory and drops it
//! when the run ends. Every worker claims its filename through the same
//! registry, so collision suffixes are assigned under a single lock.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Mutex;

/// Highest numeric suffix tried before giving up on a base name.
pub const MAX_SUFFIX: u32 = 10_000;

/// Errors from filename claiming.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Every suffix up to [`MAX_SUFFIX`] is taken.
    #[error("filename collisions exhausted for {base} after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },
}

/// Tracks filenames produced during one conversion run.
#[derive(Debug)]
pub struct FilenameRegistry {
    claimed: Mutex<HashSet<String>>,
    max_suffix: u32,
}

impl Default for FilenameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilenameRegistry {
    pub fn new() -> Self {
        Self::with_max_suffix(MAX_SUFFIX)
    }

    /// Registry with a custom suffix ceiling.
    pub fn with_max_suffix(max_suffix: u32) -> Self {
        Self { claimed: Mutex::new(HashSet::new()), max_suffix: max_suffix.max(2) }
    }

    /// Claim `filename`, or the first free `<stem>-N<ext>` variant for N >= 2.
    pub fn claim(&self, filename: &str) -> Result<String, RegistryError> {
        let mut claimed = self.claimed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.claim_in(&mut claimed, filename)
    }

    /// Claim a filename, degrading to a source-hash suffix when numeric suffixes run out.
    ///
    /// Always returns a name no other caller holds.
    pub fn claim_or_hash(&self, filename: &str, source: &str) -> String {
        let mut claimed = self.claimed.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match self.claim_in(&mut claimed, filename) {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!(%err, source, "falling back to hashed filename");
                let (stem, ext) = split_extension(filename);
                let hashed = format!("{stem}-{}", short_hash(source));

                let mut candidate = format!("{hashed}{ext}");
                let mut n: u64 = 2;
                while !claimed.insert(candidate.clone()) {
                    candidate = format!("{hashed}-{n}{ext}");
                    n += 1;
                }
                candidate
            }
        }
    }

    fn claim_in(&self, claimed: &mut HashSet<String>, filename: &str) -> Result<String, RegistryError> {
        if claimed.insert(filename.to_string()) {
            return Ok(filename.to_string());
        }

        let (stem, ext) = split_extension(filename);
        for n in 2..=self.max_suffix {
            let candidate = format!("{stem}-{n}{ext}");
            if claimed.insert(candidate.clone()) {
                tracing::debug!(base = filename, claimed = %candidate, "resolved filename collision");
                return Ok(candidate);
            }
        }

        Err(RegistryError::Exhausted { base: filename.to_string(), attempts: self.max_suffix - 1 })
    }

    /// Number of filenames claimed so far.
    pub fn len(&self) -> usize {
        self.claimed.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

/// First 8 hex digits of the SHA-256 of `input`.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_claim_unique() {
        let registry = FilenameRegistry::new();
        assert_eq!(registry.claim("GET-users.md").unwrap(), "GET-users.md");
        assert_eq!(registry.claim("POST-users.md").unwrap(), "POST-users.md");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_claim_collision_suffixes() {
        let registry = FilenameRegistry::new();
        assert_eq!(registry.claim("GET-users-get.md").unwrap(), "GET-users-get.md");
        assert_eq!(registry.claim("GET-users-get.md").unwrap(), "GET-users-get-2.md");
        assert_eq!(registry.claim("GET-users-get.md").unwrap(), "GET-users-get-3.md");
    }

    #[test]
    fn test_claim_skips_taken_suffix() {
        let registry = FilenameRegistry::new();
        registry.claim("GET-a-2.md").unwrap();
        registry.claim("GET-a.md").unwrap();
        assert_eq!(registry.claim("GET-a.md").unwrap(), "GET-a-3.md");
    }

    #[test]
    fn test_claim_exhausted() {
        let registry = FilenameRegistry::with_max_suffix(3);
        registry.claim("GET-x.md").unwrap();
        registry.claim("GET-x.md").unwrap();
        registry.claim("GET-x.md").unwrap();
        let err = registry.claim("GET-x.md").unwrap_err();
        assert_eq!(err, RegistryError::Exhausted { base: "GET-x.md".into(), attempts: 2 });
    }

    #[test]
    fn test_claim_or_hash_degrades() {
        let registry = FilenameRegistry::with_max_suffix(2);
        registry.claim("GET-x.md").unwrap();
        registry.claim("GET-x.md").unwrap();
        let name = registry.claim_or_hash("GET-x.md", "https://example.com/x");
        assert_eq!(name, format!("GET-x-{}.md", short_hash("https://example.com/x")));
    }

    #[test]
    fn test_claim_or_hash_never_reuses_hashed_name() {
        let registry = FilenameRegistry::with_max_suffix(2);
        let source = "https://example.com/x";
        registry.claim("GET-x.md").unwrap();
        registry.claim("GET-x.md").unwrap();

        let first = registry.claim_or_hash("GET-x.md", source);
        let second = registry.claim_or_hash("GET-x.md", source);
        assert_eq!(first, format!("GET-x-{}.md", short_hash(source)));
        assert_eq!(second, format!("GET-x-{}-2.md", short_hash(source)));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_concurrent_hash_fallback_is_unique() {
        let registry = Arc::new(FilenameRegistry::with_max_suffix(2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.claim_or_hash("GET-same.md", "https://example.com/same"))
            })
            .collect();

        let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("GET-a.md"), ("GET-a", ".md"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn test_short_hash_format() {
        let hash = short_hash("https://example.com");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, short_hash("https://example.com"));
    }

    #[test]
    fn test_concurrent_claims_are_unique() {
        let registry = Arc::new(FilenameRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.claim("GET-same.md").unwrap())
            })
            .collect();

        let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }
}
