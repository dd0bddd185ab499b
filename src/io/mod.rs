//! I/O operations module
//!
//! Contains the file-open collaborators with their OS access hints, chunk
//! buffers and free-space discovery.

pub mod buffer;
pub mod disk;
pub mod space;

pub use buffer::{BufferPool, Chunk};
pub use disk::{DiskIO, PlainDiskIO, PlatformDiskIO, SequentialFile, TargetFile, TestFile};
pub use space::available_space;
