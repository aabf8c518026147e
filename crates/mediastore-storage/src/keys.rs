//! Shared key policy for storage backends.
//!
//! A key is one or more `/`-separated segments, each made of ASCII letters,
//! digits, `.`, `_` or `-`. `.` and `..` segments, empty segments and a leading
//! `/` are rejected so a key can never escape a local storage root.

use crate::traits::{StorageError, StorageResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::sync::LazyLock;

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid key segment pattern"));

/// Characters left as-is when a key is embedded in a URL path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Validate a storage key against the shared naming policy.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
    }

    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "key must not start with '/': {}",
            key
        )));
    }

    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(StorageError::InvalidKey(format!("invalid key: {}", key)));
        }
        if !SEGMENT_RE.is_match(segment) {
            return Err(StorageError::InvalidKey(format!(
                "key contains invalid characters: {}",
                key
            )));
        }
    }

    Ok(())
}

/// Percent-encode every segment of `key`, keeping the `/` separators.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_nested_keys() {
        for key in ["photo.jpg", "avatar_01-small.png", "media/2024/photo.jpg", ".hidden"] {
            assert!(validate_key(key).is_ok(), "{} should be valid", key);
        }
    }

    #[test]
    fn rejects_bad_keys() {
        for key in [
            "",
            ".",
            "..",
            "/etc/passwd",
            "media/../secret",
            "media//photo.jpg",
            "media/",
            "space in name.jpg",
            "emoji-😀.png",
            "back\\slash",
        ] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn encode_key_keeps_separators() {
        assert_eq!(encode_key("media/photo.jpg"), "media/photo.jpg");
        assert_eq!(encode_key("a b/c?d"), "a%20b/c%3Fd");
    }
}
