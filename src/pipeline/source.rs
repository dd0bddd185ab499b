//! Pseudorandom chunk generation
//!
//! The data only has to defeat transparent compression and deduplication on
//! the device, so a fast non-cryptographic generator is used.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use crate::io::buffer::{BufferPool, Chunk};
use crate::{DiskFillError, Result};

/// Produces chunks of pseudorandom bytes, reusing buffers from a pool
pub struct ChunkSource {
    rng: SmallRng,
    pool: BufferPool,
    bytes_produced: u64,
}

impl ChunkSource {
    /// Create a source drawing buffers from `pool`.
    ///
    /// With a seed the byte stream is reproducible; without one the
    /// generator is seeded from OS entropy.
    pub fn new(pool: BufferPool, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        Self {
            rng,
            pool,
            bytes_produced: 0,
        }
    }

    /// Generate the next chunk of `len` bytes
    pub fn next(&mut self, len: usize) -> Result<Chunk> {
        if len == 0 || len > self.pool.buffer_size() {
            return Err(DiskFillError::GenerationFailed(format!(
                "Chunk length {} outside 1..={}",
                len,
                self.pool.buffer_size()
            )));
        }

        let buffer = self.pool.get_buffer()?;
        let mut chunk = Chunk::new(buffer, len);
        self.rng.fill_bytes(chunk.as_mut_slice());
        self.bytes_produced += len as u64;
        Ok(chunk)
    }

    /// Total bytes generated so far
    pub fn bytes_produced(&self) -> u64 {
        self.bytes_produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(size: usize) -> BufferPool {
        BufferPool::new(size, 4).unwrap()
    }

    #[test]
    fn test_chunk_has_requested_length() {
        let mut source = ChunkSource::new(pool(64), None);
        let full = source.next(64).unwrap();
        let short = source.next(10).unwrap();

        assert_eq!(full.len(), 64);
        assert_eq!(short.len(), 10);
        assert_eq!(short.capacity(), 64);
        assert_eq!(source.bytes_produced(), 74);
    }

    #[test]
    fn test_rejects_zero_and_oversized_lengths() {
        let mut source = ChunkSource::new(pool(64), None);
        assert!(matches!(source.next(0), Err(DiskFillError::GenerationFailed(_))));
        assert!(matches!(source.next(65), Err(DiskFillError::GenerationFailed(_))));
    }

    #[test]
    fn test_seeded_sources_are_reproducible() {
        let mut a = ChunkSource::new(pool(128), Some(42));
        let mut b = ChunkSource::new(pool(128), Some(42));
        assert_eq!(a.next(128).unwrap().as_slice(), b.next(128).unwrap().as_slice());

        let mut c = ChunkSource::new(pool(128), Some(43));
        let mut d = ChunkSource::new(pool(128), Some(42));
        assert_ne!(c.next(128).unwrap().as_slice(), d.next(128).unwrap().as_slice());
    }

    #[test]
    fn test_output_is_not_trivially_compressible() {
        let mut source = ChunkSource::new(pool(64 * 1024), Some(7));
        let chunk = source.next(64 * 1024).unwrap();

        let mut counts = [0usize; 256];
        for &b in chunk.as_slice() {
            counts[b as usize] += 1;
        }
        // Every byte value shows up and none dominates
        assert!(counts.iter().all(|&c| c > 0));
        assert!(counts.iter().all(|&c| c < 64 * 1024 / 64));
    }

    #[test]
    fn test_recycled_buffers_are_overwritten() {
        let pool = pool(32);
        let mut source = ChunkSource::new(pool.clone(), Some(1));

        let first = source.next(32).unwrap();
        let first_bytes = first.as_slice().to_vec();
        pool.return_buffer(first.into_buffer()).unwrap();

        let second = source.next(32).unwrap();
        assert_eq!(pool.pool_size().unwrap(), 0);
        assert_ne!(second.as_slice(), first_bytes.as_slice());
    }
}
