//! Bounded single-producer single-consumer queue
//!
//! A thin wrapper over `tokio::sync::mpsc` that gives the write pipeline
//! push/pop/close semantics from both async code and blocking threads.

use tokio::sync::mpsc;

/// Returned by a push after the receiving side has gone away.
///
/// Carries the rejected item back to the caller.
#[derive(Debug)]
pub struct Closed<T>(pub T);

/// Create a channel holding at most `depth` items in flight.
///
/// `depth` must be at least 1.
pub fn bounded<T>(depth: usize) -> (ChunkSender<T>, ChunkReceiver<T>) {
    let (tx, rx) = mpsc::channel(depth);
    (ChunkSender { tx }, ChunkReceiver { rx })
}

/// Producing half; dropping it closes the channel once drained
pub struct ChunkSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> ChunkSender<T> {
    /// Wait for a free slot and enqueue `item`
    pub async fn push(&self, item: T) -> Result<(), Closed<T>> {
        self.tx.send(item).await.map_err(|e| Closed(e.0))
    }

    /// Blocking variant of [`push`](Self::push) for worker threads.
    ///
    /// Must not be called from inside an async context.
    pub fn blocking_push(&self, item: T) -> Result<(), Closed<T>> {
        self.tx.blocking_send(item).map_err(|e| Closed(e.0))
    }

    /// Items pushed but not yet popped
    pub fn in_flight(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// True once the receiver was closed or dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consuming half
pub struct ChunkReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> ChunkReceiver<T> {
    /// Wait for the next item; `None` once closed and drained
    pub async fn pop(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Blocking variant of [`pop`](Self::pop) for worker threads
    pub fn blocking_pop(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }

    /// Refuse further pushes; items already queued can still be popped
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let (tx, mut rx) = bounded(4);
        let producer = tokio::spawn(async move {
            for i in 0..100u32 {
                tx.push(i).await.unwrap();
            }
        });

        let mut seen = Vec::new();
        while let Some(i) = rx.pop().await {
            seen.push(i);
        }
        producer.await.unwrap();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_push_beyond_depth_waits_for_pop() {
        let depth = 3;
        let (tx, mut rx) = bounded(depth);
        let pushed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&pushed);
        let producer = tokio::spawn(async move {
            for i in 0..=depth {
                tx.push(i).await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
            }
            tx
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pushed.load(Ordering::SeqCst), depth);

        assert_eq!(rx.pop().await, Some(0));
        let tx = producer.await.unwrap();
        assert_eq!(pushed.load(Ordering::SeqCst), depth + 1);
        assert_eq!(tx.in_flight(), depth);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_depth() {
        for depth in 1..=4usize {
            let (tx, mut rx) = bounded(depth);
            let producer = tokio::spawn(async move {
                let mut max_seen = 0;
                for i in 0..50usize {
                    tx.push(i).await.unwrap();
                    max_seen = max_seen.max(tx.in_flight());
                }
                max_seen
            });

            while rx.pop().await.is_some() {
                tokio::task::yield_now().await;
            }
            let max_seen = producer.await.unwrap();
            assert!(max_seen <= depth, "depth {} saw {}", depth, max_seen);
        }
    }

    #[tokio::test]
    async fn test_close_drains_then_signals() {
        let (tx, mut rx) = bounded(2);
        tx.push(1u8).await.unwrap();
        tx.push(2u8).await.unwrap();

        rx.close();
        assert!(tx.is_closed());
        assert!(matches!(tx.push(3).await, Err(Closed(3))));

        assert_eq!(rx.pop().await, Some(1));
        assert_eq!(rx.pop().await, Some(2));
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn test_dropping_receiver_unblocks_full_producer() {
        let (tx, rx) = bounded(1);
        tx.push(0u8).await.unwrap();

        let producer = tokio::spawn(async move { tx.push(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(rx);

        let result = tokio::time::timeout(Duration::from_secs(5), producer)
            .await
            .expect("producer stayed blocked")
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_blocking_halves_on_worker_threads() {
        let (tx, mut rx) = bounded(2);
        let producer = tokio::task::spawn_blocking(move || {
            for i in 0..10u32 {
                tx.blocking_push(i).unwrap();
            }
        });
        let consumer = tokio::task::spawn_blocking(move || {
            let mut sum = 0;
            while let Some(i) = rx.blocking_pop() {
                sum += i;
            }
            sum
        });

        producer.await.unwrap();
        assert_eq!(consumer.await.unwrap(), 45);
    }
}
