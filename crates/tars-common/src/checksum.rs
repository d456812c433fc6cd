//! MD5 checksum utilities for result file verification
//!
//! A previous export is only treated as confirmed when the content found in
//! the file share still hashes to the digest recorded in its metadata.

/// Compute the lowercase hex MD5 digest of `content`
pub fn checksum(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

/// Check `content` against a stored digest
pub fn matches(content: &[u8], expected: &str) -> bool {
    checksum(content) == expected
}
