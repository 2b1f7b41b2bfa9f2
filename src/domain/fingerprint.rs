//! URL fingerprints and the hashes derived from them.
//!
//! A [`FullHash`] is the 40-character lowercase hex SHA-1 digest of a
//! normalized URL. A [`ShortHash`] is a prefix of some full hash and is what
//! appears in public short links.

use std::fmt;

use sha1::{Digest, Sha1};

use crate::error::LinkError;

/// Length of a hex-encoded SHA-1 digest.
pub const FULL_HASH_LEN: usize = 40;

/// Hex-encoded SHA-1 digest of a normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullHash(String);

impl FullHash {
    /// Parses a 40-character hex digest. Uppercase digits are folded to lowercase.
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() == FULL_HASH_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the first `len` characters as a short hash.
    ///
    /// `len` is clamped to `1..=40`.
    pub fn prefix(&self, len: usize) -> ShortHash {
        let len = len.clamp(1, FULL_HASH_LEN);
        ShortHash(self.0[..len].to_owned())
    }
}

impl fmt::Display for FullHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public identifier of a link: a prefix of its [`FullHash`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortHash(String);

impl ShortHash {
    /// Parses 1 to 40 hex characters. Uppercase digits are folded to lowercase.
    pub fn parse(value: &str) -> Option<Self> {
        if !value.is_empty()
            && value.len() <= FULL_HASH_LEN
            && value.bytes().all(|b| b.is_ascii_hexdigit())
        {
            Some(Self(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_prefix_of(&self, full_hash: &FullHash) -> bool {
        full_hash.as_str().starts_with(&self.0)
    }
}

impl fmt::Display for ShortHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a normalized URL to its fingerprint.
#[cfg_attr(test, mockall::automock)]
pub trait Fingerprinter: Send + Sync {
    /// # Errors
    ///
    /// Returns [`LinkError::Encoding`] if the URL cannot be represented as
    /// clean UTF-8 bytes.
    fn fingerprint(&self, normalized_url: &str) -> Result<FullHash, LinkError>;
}

/// SHA-1 over the UTF-8 bytes of the URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Fingerprinter;

impl Fingerprinter for Sha1Fingerprinter {
    fn fingerprint(&self, normalized_url: &str) -> Result<FullHash, LinkError> {
        fingerprint(normalized_url)
    }
}

/// Computes the SHA-1 fingerprint of a normalized URL.
///
/// Text carrying a replacement character or a NUL byte was already damaged
/// by a lossy decode upstream and is rejected rather than hashed.
///
/// # Errors
///
/// Returns [`LinkError::Encoding`] for such input.
///
/// # Examples
///
/// ```ignore
/// let hash = fingerprint("abc")?;
/// assert_eq!(hash.as_str(), "a9993e364706816aba3e25717850c26c9cd0d89d");
/// ```
pub fn fingerprint(normalized_url: &str) -> Result<FullHash, LinkError> {
    if normalized_url.contains(char::REPLACEMENT_CHARACTER) {
        return Err(LinkError::Encoding(
            "url contains a U+FFFD replacement character".to_string(),
        ));
    }
    if normalized_url.contains('\0') {
        return Err(LinkError::Encoding("url contains a NUL byte".to_string()));
    }

    let digest = Sha1::digest(normalized_url.as_bytes());
    Ok(FullHash(hex::encode(digest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            fingerprint("abc").unwrap().as_str(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            fingerprint("").unwrap().as_str(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint("http://example.com/a").unwrap();
        let b = fingerprint("http://example.com/a").unwrap();
        let c = fingerprint("http://example.com/b").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), FULL_HASH_LEN);
        assert!(a.as_str().bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_fingerprint_hashes_utf8_bytes() {
        let hash = fingerprint("http://example.com/ü").unwrap();
        assert_eq!(hash.as_str().len(), FULL_HASH_LEN);
    }

    #[test]
    fn test_fingerprint_rejects_damaged_text() {
        assert!(matches!(
            fingerprint("http://example.com/\u{FFFD}"),
            Err(LinkError::Encoding(_))
        ));
        assert!(matches!(
            fingerprint("http://example.com/\0"),
            Err(LinkError::Encoding(_))
        ));
    }

    #[test]
    fn test_prefix_is_clamped() {
        let hash = fingerprint("abc").unwrap();
        assert_eq!(hash.prefix(4).as_str(), "a999");
        assert_eq!(hash.prefix(0).as_str(), "a");
        assert_eq!(hash.prefix(100).as_str(), hash.as_str());
        assert!(hash.prefix(7).is_prefix_of(&hash));
    }

    #[test]
    fn test_short_hash_parse() {
        assert_eq!(ShortHash::parse("ABCD").unwrap().as_str(), "abcd");
        assert!(ShortHash::parse("").is_none());
        assert!(ShortHash::parse("favicon.ico").is_none());
        assert!(ShortHash::parse(&"a".repeat(41)).is_none());
    }

    #[test]
    fn test_full_hash_parse() {
        assert!(FullHash::parse("a9993e364706816aba3e25717850c26c9cd0d89d").is_some());
        assert!(FullHash::parse("a9993e").is_none());
        assert!(FullHash::parse(&"g".repeat(40)).is_none());
    }
}
