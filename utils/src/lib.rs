//! # Fixture Utilities
//!
//! Content hashing for data revisions, random suffixes for generated table
//! names, and identifier validation.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use uuid::Uuid;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Compute SHA-256 hash of content string
///
/// # Examples
///
/// ```
/// use utils::compute_content_hash;
///
/// let hash = compute_content_hash("hello world");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compute a revision hash over a sequence of rows.
///
/// Rows are hashed in order; each row is serialized as JSON and terminated
/// by a newline so `[["a"], ["b"]]` and `[["ab"]]` never collide.
#[must_use]
pub fn compute_rows_revision<'a, I>(rows: I) -> String
where
    I: IntoIterator<Item = &'a [serde_json::Value]>
{
    let mut hasher = Sha256::new();
    for row in rows {
        for value in row {
            hasher.update(value.to_string().as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Random lowercase hex suffix of `len` characters (max 32).
#[must_use]
pub fn random_suffix(len: usize) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..len.min(simple.len())].to_string()
}

/// Whether `name` is a plain, unquoted SQL identifier.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}
