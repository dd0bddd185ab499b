//! Incremental content digests
//!
//! Each pass owns a fresh [`IncrementalDigest`]; the same algorithm is used
//! for the write and the read pass so the hex strings compare directly.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest fed with every byte of a pass, in order
pub trait IncrementalDigest: Send {
    fn update(&mut self, data: &[u8]);

    /// Consume the state and return the lowercase hex digest
    fn finalize(self: Box<Self>) -> String;
}

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Start a new, empty digest
    pub fn start(&self) -> Box<dyn IncrementalDigest> {
        match self {
            DigestAlgorithm::Sha256 => Box::new(Sha256Digest::default()),
            DigestAlgorithm::Blake3 => Box::new(Blake3Digest::default()),
        }
    }

    /// Length of the hex string produced by [`IncrementalDigest::finalize`]
    pub fn hex_len(&self) -> usize {
        64
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Blake3 => "BLAKE3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            _ => Err(format!("Unknown digest algorithm: {}", s)),
        }
    }
}

#[derive(Default)]
pub struct Sha256Digest(Sha256);

impl IncrementalDigest for Sha256Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        hex::encode(self.0.finalize())
    }
}

#[derive(Default)]
pub struct Blake3Digest(blake3::Hasher);

impl IncrementalDigest for Blake3Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        hex::encode(self.0.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        let mut digest = DigestAlgorithm::Sha256.start();
        digest.update(b"abc");
        assert_eq!(
            digest.finalize(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_is_independent_of_update_boundaries() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();

        for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Blake3] {
            let mut whole = algorithm.start();
            whole.update(&data);

            let mut pieces = algorithm.start();
            for chunk in data.chunks(777) {
                pieces.update(chunk);
            }

            let whole = whole.finalize();
            assert_eq!(whole.len(), algorithm.hex_len());
            assert_eq!(whole, pieces.finalize());
            assert!(whole.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_algorithms_differ() {
        let mut sha = DigestAlgorithm::Sha256.start();
        let mut blake = DigestAlgorithm::Blake3.start();
        sha.update(b"same input");
        blake.update(b"same input");
        assert_ne!(sha.finalize(), blake.finalize());
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("sha256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("SHA-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("blake3".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Blake3);
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }
}
