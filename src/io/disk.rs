use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Opens the test file for the write and read passes.
///
/// Implementations decide which OS access hints to apply; the pipelines
/// behave the same whether or not a hint is honoured.
pub trait DiskIO: Send + Sync {
    /// Create or truncate `path` for sequential writing
    fn open_sequential_write(&self, path: &Path) -> io::Result<Box<dyn TargetFile>>;

    /// Open an existing `path` for sequential reading
    fn open_sequential_read(&self, path: &Path) -> io::Result<Box<dyn TargetFile>>;

    /// Short name for log output
    fn name(&self) -> &'static str;
}

/// Sequential file handle used by one pass
pub trait TargetFile: Send {
    /// Write the whole buffer at the current offset
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Fill `buf` from the current offset, stopping early only at end of file
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Force written data to stable storage
    fn sync_all(&mut self) -> io::Result<()>;
}

/// [`TargetFile`] over a plain `std::fs::File`
pub struct SequentialFile {
    file: File,
}

impl SequentialFile {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

impl TargetFile for SequentialFile {
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<()> {
        // write_all turns a zero-length write (device full) into WriteZero
        self.file.write_all(buf)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn sync_all(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }
}

/// Opens files without any access-pattern hint
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainDiskIO;

impl DiskIO for PlainDiskIO {
    fn open_sequential_write(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(SequentialFile::new(file)))
    }

    fn open_sequential_read(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Box::new(SequentialFile::new(file)))
    }

    fn name(&self) -> &'static str {
        "plain"
    }
}

/// Platform-specific disk I/O that asks the OS for sequential access
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformDiskIO;

impl PlatformDiskIO {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_FLAG_SEQUENTIAL_SCAN: u32 = 0x0800_0000;

    impl DiskIO for PlatformDiskIO {
        fn open_sequential_write(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .custom_flags(FILE_FLAG_SEQUENTIAL_SCAN)
                .open(path)?;

            Ok(Box::new(SequentialFile::new(file)))
        }

        fn open_sequential_read(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
            let file = OpenOptions::new()
                .read(true)
                .custom_flags(FILE_FLAG_SEQUENTIAL_SCAN)
                .open(path)?;

            Ok(Box::new(SequentialFile::new(file)))
        }

        fn name(&self) -> &'static str {
            "windows-sequential-scan"
        }
    }
}

#[cfg(unix)]
mod unix_impl {
    use super::*;

    /// Advise the kernel that `file` will be accessed sequentially.
    ///
    /// Failure only loses the hint, so it is logged and ignored.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn advise_sequential(file: &File) {
        use std::os::unix::io::AsRawFd;

        let ret = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
        if ret != 0 {
            tracing::debug!(errno = ret, "posix_fadvise(SEQUENTIAL) not honoured");
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn advise_sequential(_file: &File) {}

    impl DiskIO for PlatformDiskIO {
        fn open_sequential_write(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            advise_sequential(&file);
            Ok(Box::new(SequentialFile::new(file)))
        }

        fn open_sequential_read(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
            let file = OpenOptions::new().read(true).open(path)?;
            advise_sequential(&file);
            Ok(Box::new(SequentialFile::new(file)))
        }

        fn name(&self) -> &'static str {
            "unix-fadvise"
        }
    }
}

#[cfg(not(any(unix, windows)))]
impl DiskIO for PlatformDiskIO {
    fn open_sequential_write(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        PlainDiskIO.open_sequential_write(path)
    }

    fn open_sequential_read(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        PlainDiskIO.open_sequential_read(path)
    }

    fn name(&self) -> &'static str {
        PlainDiskIO.name()
    }
}

/// Guard for the test file that deletes it on drop unless kept
#[derive(Debug)]
pub struct TestFile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl TestFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cleanup_on_drop: true,
        }
    }

    /// Leave the file on disk when the guard is dropped
    pub fn keep_on_drop(&mut self) {
        self.cleanup_on_drop = false;
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting the error instead of swallowing it
    pub fn remove(mut self) -> io::Result<()> {
        self.cleanup_on_drop = false;
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for TestFile {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "could not delete test file");
                }
            }
        }
    }
}
