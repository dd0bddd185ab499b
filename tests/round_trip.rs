use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use diskfill::config::FillConfig;
use diskfill::io::{DiskIO, PlainDiskIO, TargetFile};
use diskfill::plan::plan_target;
use diskfill::{DigestAlgorithm, DiskFillTest, IntegrityVerdict, PassKind, RunTarget};
use tempfile::tempdir;
use tokio::sync::mpsc;

/// Plain file access that remembers the length of every write
#[derive(Default)]
struct RecordingDiskIO {
    writes: Arc<Mutex<Vec<usize>>>,
}

impl RecordingDiskIO {
    fn writes(&self) -> Vec<usize> {
        self.writes.lock().unwrap().clone()
    }
}

impl DiskIO for RecordingDiskIO {
    fn open_sequential_write(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        Ok(Box::new(RecordingFile {
            inner: PlainDiskIO.open_sequential_write(path)?,
            writes: Arc::clone(&self.writes),
        }))
    }

    fn open_sequential_read(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        PlainDiskIO.open_sequential_read(path)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct RecordingFile {
    inner: Box<dyn TargetFile>,
    writes: Arc<Mutex<Vec<usize>>>,
}

impl TargetFile for RecordingFile {
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writes.lock().unwrap().push(buf.len());
        self.inner.write_chunk(buf)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read_chunk(buf)
    }

    fn sync_all(&mut self) -> io::Result<()> {
        self.inner.sync_all()
    }
}

#[tokio::test]
async fn test_writer_receives_planned_chunk_lengths() {
    for (total, chunk, expected) in [
        (192u64, 64usize, vec![64, 64, 64]),
        (1000, 300, vec![300, 300, 300, 100]),
    ] {
        let temp_dir = tempdir().unwrap();
        let target = RunTarget::new(temp_dir.path().join("fill.bin"), total, chunk, 2).unwrap();
        let disk_io = Arc::new(RecordingDiskIO::default());

        let (tx, _rx) = mpsc::channel(100);
        let outcome = DiskFillTest::new(target)
            .with_disk_io(disk_io.clone())
            .run(tx)
            .await
            .unwrap();

        assert!(outcome.verdict.is_ok());
        assert_eq!(disk_io.writes(), expected);
    }
}

#[tokio::test]
async fn test_three_chunks_of_64_bytes() {
    let temp_dir = tempdir().unwrap();
    let target = RunTarget::new(temp_dir.path().join("fill.bin"), 192, 64, 2).unwrap();
    assert_eq!(target.chunk_count(), 3);

    let (tx, _rx) = mpsc::channel(100);
    let outcome = DiskFillTest::new(target.clone()).run(tx).await.unwrap();

    assert_eq!(outcome.write.total_bytes, 192);
    assert_eq!(outcome.read.total_bytes, 192);
    assert_eq!(outcome.write.digest, outcome.read.digest);
    assert_eq!(outcome.verdict, IntegrityVerdict::Ok);
    assert_eq!(std::fs::metadata(&target.path).unwrap().len(), 192);
}

#[tokio::test]
async fn test_partial_last_chunk() {
    let temp_dir = tempdir().unwrap();
    let target = RunTarget::new(temp_dir.path().join("fill.bin"), 1000, 300, 3).unwrap();
    assert_eq!(target.last_chunk_len(), 100);

    let (tx, _rx) = mpsc::channel(100);
    let outcome = DiskFillTest::new(target.clone())
        .with_disk_io(Arc::new(PlainDiskIO))
        .run(tx)
        .await
        .unwrap();

    assert!(outcome.verdict.is_ok());
    assert_eq!(std::fs::metadata(&target.path).unwrap().len(), 1000);
}

#[tokio::test]
async fn test_queue_depth_one_and_blake3() {
    let temp_dir = tempdir().unwrap();
    let target = RunTarget::new(temp_dir.path().join("fill.bin"), 64 * 1024, 4096, 1).unwrap();

    let (tx, _rx) = mpsc::channel(100);
    let outcome = DiskFillTest::new(target.clone())
        .with_digest(DigestAlgorithm::Blake3)
        .run(tx)
        .await
        .unwrap();

    assert!(outcome.verdict.is_ok());
    let expected = blake3::hash(&std::fs::read(&target.path).unwrap()).to_hex().to_string();
    assert_eq!(outcome.read.digest, expected);
}

#[tokio::test]
async fn test_same_seed_same_digest() {
    let temp_dir = tempdir().unwrap();
    let (tx, _rx) = mpsc::channel(100);

    let mut digests = Vec::new();
    for name in ["a.bin", "b.bin"] {
        let target = RunTarget::new(temp_dir.path().join(name), 10_000, 1024, 2).unwrap();
        let outcome = DiskFillTest::new(target)
            .with_seed(Some(1234))
            .run(tx.clone())
            .await
            .unwrap();
        digests.push(outcome.write.digest);
    }
    assert_eq!(digests[0], digests[1]);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let temp_dir = tempdir().unwrap();
    let target = RunTarget::new(temp_dir.path().join("fill.bin"), 2 * 1024 * 1024, 16 * 1024, 3).unwrap();

    let (tx, mut rx) = mpsc::channel(10_000);
    let test = DiskFillTest::new(target).with_progress_interval(Duration::from_millis(1));
    let outcome = test.run(tx).await.unwrap();
    assert!(outcome.verdict.is_ok());

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    for pass in [PassKind::Write, PassKind::Read] {
        let of_pass: Vec<_> = updates.iter().filter(|u| u.pass == pass).collect();
        assert!(!of_pass.is_empty());
        assert!(of_pass
            .windows(2)
            .all(|w| w[0].bytes_processed <= w[1].bytes_processed && w[0].elapsed <= w[1].elapsed));
        let last = of_pass.last().unwrap();
        assert_eq!(last.bytes_processed, 2 * 1024 * 1024);
        assert_eq!(last.completion_percentage(), 1.0);
    }
}

#[tokio::test]
async fn test_planned_run_with_size_limit() {
    let temp_dir = tempdir().unwrap();
    let config = FillConfig::new()
        .with_reserve(0)
        .with_chunk_size(256)
        .with_file_name("planned.bin");

    let target = plan_target(temp_dir.path(), &config, 1 << 40, Some(5000)).unwrap();
    assert_eq!(target.total_bytes, 5000);

    let (tx, _rx) = mpsc::channel(100);
    let outcome = DiskFillTest::new(target.clone()).run(tx).await.unwrap();
    assert!(outcome.verdict.is_ok());
    assert_eq!(
        std::fs::metadata(temp_dir.path().join("planned.bin")).unwrap().len(),
        5000
    );
}
