use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use crate::{DiskFillError, Result};

/// One unit of data moving through the write pipeline.
///
/// The backing buffer always has the pool's full capacity; `len` is the
/// logical length, shorter only for the final chunk of a run.
#[derive(Debug)]
pub struct Chunk {
    buffer: Vec<u8>,
    len: usize,
}

impl Chunk {
    /// Wrap `buffer`, exposing only its first `len` bytes
    pub fn new(buffer: Vec<u8>, len: usize) -> Self {
        debug_assert!(len <= buffer.len());
        Self { buffer, len }
    }

    /// Logical bytes of this chunk
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buffer[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Capacity of the backing buffer
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Give the backing buffer back, e.g. to recycle it
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }
}

/// Buffer pool for reusing chunk buffers between the writer and the generator
pub struct BufferPool {
    buffers: Arc<Mutex<VecDeque<Vec<u8>>>>,
    buffer_size: usize,
    max_buffers: usize,
}

impl BufferPool {
    /// Create a new buffer pool with specified buffer size and maximum count
    pub fn new(buffer_size: usize, max_buffers: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(DiskFillError::ConfigError("Buffer size must be greater than 0".to_string()));
        }
        if max_buffers == 0 {
            return Err(DiskFillError::ConfigError("Max buffers must be greater than 0".to_string()));
        }

        Ok(Self {
            buffers: Arc::new(Mutex::new(VecDeque::new())),
            buffer_size,
            max_buffers,
        })
    }

    /// Get a buffer from the pool, allocating a new one if none is available.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn get_buffer(&self) -> Result<Vec<u8>> {
        let recycled = self.buffers.lock()
            .map_err(|_| DiskFillError::GenerationFailed("Buffer pool lock poisoned".to_string()))?
            .pop_front();

        if let Some(buffer) = recycled {
            return Ok(buffer);
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(self.buffer_size).map_err(|e| {
            DiskFillError::GenerationFailed(format!(
                "Could not allocate a {} byte buffer: {}",
                self.buffer_size, e
            ))
        })?;
        buffer.resize(self.buffer_size, 0);
        Ok(buffer)
    }

    /// Return a buffer to the pool for reuse
    pub fn return_buffer(&self, buffer: Vec<u8>) -> Result<()> {
        if buffer.len() == self.buffer_size {
            let mut buffers = self.buffers.lock()
                .map_err(|_| DiskFillError::GenerationFailed("Buffer pool lock poisoned".to_string()))?;

            if buffers.len() < self.max_buffers {
                buffers.push_back(buffer);
            }
        }
        Ok(())
    }

    /// Put a written chunk's buffer back for the generator to reuse
    pub fn recycle(&self, chunk: Chunk) {
        if let Err(e) = self.return_buffer(chunk.into_buffer()) {
            tracing::warn!(error = %e, "could not recycle chunk buffer");
        }
    }

    /// Get the configured buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Get current number of pooled buffers
    pub fn pool_size(&self) -> Result<usize> {
        let buffers = self.buffers.lock()
            .map_err(|_| DiskFillError::GenerationFailed("Buffer pool lock poisoned".to_string()))?;
        Ok(buffers.len())
    }
}

impl Clone for BufferPool {
    fn clone(&self) -> Self {
        Self {
            buffers: Arc::clone(&self.buffers),
            buffer_size: self.buffer_size,
            max_buffers: self.max_buffers,
        }
    }
}
