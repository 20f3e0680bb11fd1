//! Content hash used as the cache key for submitted images
//!
//! Images are fingerprinted with MD5 over their raw bytes. The hash is
//! stored as a 16-byte array and rendered as lowercase hex on the wire and
//! in persisted cache entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A hex string that is not a valid MD5 digest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid content hash: {hash}. Expected 32 hexadecimal characters")]
pub struct InvalidHashError {
    pub hash: String,
}

/// MD5 digest of an image body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Hash a complete in-memory body
    pub fn digest(bytes: &[u8]) -> Self {
        ContentHash(md5::compute(bytes).0)
    }

    /// Parse a 32-character hex digest (case insensitive)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use source_finder::app::ContentHash;
    ///
    /// let hash = ContentHash::from_hex("50C9D1C465F3CBFF652BE1509C2E2A4E")?;
    /// assert_eq!(hash.to_hex(), "50c9d1c465f3cbff652be1509c2e2a4e");
    /// # Ok::<(), source_finder::app::hash::InvalidHashError>(())
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, InvalidHashError> {
        let invalid = || InvalidHashError {
            hash: hex.to_string(),
        };

        if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; 16];
        for (slot, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks(2)) {
            let pair = std::str::from_utf8(pair).map_err(|_| invalid())?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }

        Ok(ContentHash(bytes))
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.0.iter().fold(String::with_capacity(32), |mut acc, b| {
            let _ = write!(&mut acc, "{:02x}", b);
            acc
        })
    }
}

/// Incremental hasher for streamed bodies
pub struct ContentHasher {
    context: md5::Context,
    consumed: usize,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            context: md5::Context::new(),
            consumed: 0,
        }
    }

    /// Feed the next chunk of the body
    pub fn update(&mut self, chunk: &[u8]) {
        self.consumed += chunk.len();
        self.context.consume(chunk);
    }

    /// Number of bytes hashed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn finish(self) -> ContentHash {
        ContentHash(self.context.compute().0)
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = InvalidHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Persisted and logged as a hex string
impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex_string = String::deserialize(deserializer)?;
        Self::from_hex(&hex_string).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_known_value() {
        // MD5 of the empty input
        let hash = ContentHash::digest(b"");
        assert_eq!(hash.to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_streamed_hash_equals_digest() {
        let body = b"not really a jpeg, but bytes are bytes";
        let mut hasher = ContentHasher::new();
        for chunk in body.chunks(7) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.consumed(), body.len());
        assert_eq!(hasher.finish(), ContentHash::digest(body));
    }

    #[test]
    fn test_case_insensitive_parse() {
        let lower = ContentHash::from_hex("50c9d1c465f3cbff652be1509c2e2a4e").unwrap();
        let upper: ContentHash = "50C9D1C465F3CBFF652BE1509C2E2A4E".parse().unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_invalid_hex_strings() {
        let invalid_cases = [
            "",
            "50c9d1c465f3cbff652be1509c2e2a4",
            "50c9d1c465f3cbff652be1509c2e2a4e5",
            "50c9d1c465f3cbff652be1509c2e2a4g",
            "50c9d1c4 65f3cbff652be1509c2e2a4e",
        ];

        for hex in &invalid_cases {
            assert!(ContentHash::from_hex(hex).is_err(), "Should reject: {}", hex);
        }
    }

    #[test]
    fn test_serializes_as_hex_string() {
        let hash = ContentHash::from_hex("9734faa872681f96b144f60d29d52011").unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"9734faa872681f96b144f60d29d52011\"");

        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<ContentHash>("\"nope\"").is_err());
    }
}
