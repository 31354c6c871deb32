use sha2::{Digest, Sha256};
use std::fmt;

/// Bumped whenever the cached value layout changes.
const KEY_VERSION: &str = "v1";

/// Deterministic cache key for a query.
///
/// Two requests map to the same key exactly when they agree on the trimmed
/// question, `max_results` and `include_metadata`. Case and inner whitespace
/// are significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_query(question: &str, max_results: usize, include_metadata: bool) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_VERSION.as_bytes());
        hasher.update(b"|");
        hasher.update(max_results.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(if include_metadata { b"1" } else { b"0" });
        hasher.update(b"|");
        hasher.update(question.trim().as_bytes());
        Self(format!("query:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
