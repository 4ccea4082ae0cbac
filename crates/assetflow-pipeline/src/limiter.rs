//! Generic bounded-concurrency gate.
//!
//! Wraps arbitrary async work so that at most N executions are active
//! across all call sites sharing one instance. Excess calls queue in FIFO
//! order and are released strictly in arrival order as slots free up.
//! Queued-but-not-yet-started calls hold no resources: cancelling one
//! (dropping its future) removes it from the queue without ever starting
//! it, and cancelling an active call frees its slot immediately.
//!
//! This primitive knows nothing about uploads.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// FIFO bounded-concurrency gate. Cheap to clone; clones share the limit.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// A held concurrency slot. The slot frees when this is dropped.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(limit: usize) -> Self {
        assert!(limit > 0, "concurrency limit must be at least 1");
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot, then run `work` to completion while holding it.
    ///
    /// The active window starts when `work` begins executing and ends when
    /// it completes or errors; dropping the returned future while queued
    /// never starts `work`.
    pub async fn run<F, T>(&self, work: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let _slot = self.acquire().await;
        work.await
    }

    /// Acquire a slot whose lifetime the caller manages, for work that
    /// spans a spawned task rather than a single future.
    pub async fn acquire(&self) -> Slot {
        // The semaphore never closes, so acquisition only fails after a
        // close; treat that as a bug.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("limiter semaphore closed");
        Slot { _permit: permit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let limiter = ConcurrencyLimiter::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(active.load(Ordering::SeqCst), 0);
        assert_eq!(limiter.available(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_equal_calls_through_limit_two_complete_in_waves() {
        let limiter = ConcurrencyLimiter::new(2);
        let origin = Instant::now();
        let starts = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            let starts = starts.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        starts.lock().await.push(origin.elapsed().as_millis() as u64);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Waves of 2, 2, 1
        let starts = starts.lock().await;
        assert_eq!(starts.len(), 5);
        assert_eq!(&starts[..2], &[0, 0]);
        assert_eq!(&starts[2..4], &[100, 100]);
        assert_eq!(starts[4], 200);
    }

    #[tokio::test]
    async fn test_fifo_release_order() {
        let limiter = ConcurrencyLimiter::new(1);
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        // Hold the only slot so the rest queue in a known order.
        let gate = limiter.acquire().await;

        let mut handles = Vec::new();
        for i in 0..4 {
            let limiter = limiter.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        order.lock().await.push(i);
                    })
                    .await;
            }));
            // Make queue arrival order deterministic.
            tokio::task::yield_now().await;
        }

        drop(gate);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().await, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cancelled_queued_call_never_starts() {
        let limiter = ConcurrencyLimiter::new(1);
        let started = Arc::new(AtomicUsize::new(0));

        let gate = limiter.acquire().await;

        let queued = {
            let limiter = limiter.clone();
            let started = started.clone();
            tokio::spawn(async move {
                limiter
                    .run(async {
                        started.fetch_add(1, Ordering::SeqCst);
                    })
                    .await;
            })
        };
        tokio::task::yield_now().await;
        queued.abort();
        let _ = queued.await;

        drop(gate);
        // A later call still gets the slot.
        limiter.run(async {}).await;

        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_cancelling_active_call_frees_slot() {
        let limiter = ConcurrencyLimiter::new(1);

        let active = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    })
                    .await;
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(limiter.available(), 0);

        active.abort();
        let _ = active.await;

        // Slot is free again for the next caller.
        limiter.run(async {}).await;
        assert_eq!(limiter.available(), 1);
    }
}
