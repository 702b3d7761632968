//! Fixed-size fan-out/fan-in worker pool
//!
//! Items go through one bounded work queue shared by every worker; each
//! worker pushes exactly one output per item into an unbounded result
//! channel. `run` joins all workers before draining the results, so the
//! caller never observes a partial result set.

use crate::{log_debug, log_error};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
    queue_capacity: usize,
}

impl WorkerPool {
    /// Both values are raised to at least 1
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process every item and return one output per item, in completion order.
    ///
    /// `on_panic` turns an item whose `work` future panicked into an output,
    /// which keeps the one-output-per-item guarantee.
    pub async fn run<I, O, F, Fut, P>(&self, items: Vec<I>, work: F, on_panic: P) -> Vec<O>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
        P: Fn(I, String) -> O + Send + Sync + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }

        let worker_count = self.workers.min(total);
        let (work_tx, work_rx) = mpsc::channel::<I>(self.queue_capacity);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<O>();
        let work = Arc::new(work);
        let on_panic = Arc::new(on_panic);

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let work = Arc::clone(&work);
            let on_panic = Arc::clone(&on_panic);

            workers.spawn(async move {
                let mut handled = 0usize;
                loop {
                    let item = {
                        let mut rx = work_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(item) = item else {
                        break;
                    };

                    let input = item.clone();
                    let job = Arc::clone(&work);
                    let outcome = AssertUnwindSafe(async move { job(input).await })
                        .catch_unwind()
                        .await;
                    let output = match outcome {
                        Ok(output) => output,
                        Err(panic) => {
                            let reason = panic_reason(&*panic);
                            log_error!("Worker {} panicked on an item: {}", worker_id, reason);
                            on_panic(item, reason)
                        }
                    };

                    handled += 1;
                    // the receiver outlives every worker, send cannot fail here
                    let _ = result_tx.send(output);
                }
                log_debug!("Worker {} drained the queue after {} items", worker_id, handled);
            });
        }
        // only the workers hold result senders from here on
        drop(result_tx);

        for item in items {
            if work_tx.send(item).await.is_err() {
                log_error!("Work queue closed before all items were submitted");
                break;
            }
        }
        drop(work_tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                log_error!("Worker task failed: {}", e);
            }
        }

        let mut outputs = Vec::with_capacity(total);
        while let Some(output) = result_rx.recv().await {
            outputs.push(output);
        }
        outputs
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = WorkerPool::new(4, 8);
        let outputs: Vec<u32> = pool
            .run(Vec::<u32>::new(), |n| async move { n }, |n, _| n)
            .await;
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_every_item_yields_one_output() {
        let pool = WorkerPool::new(3, 2);
        let mut outputs = pool
            .run((0..50u32).collect(), |n| async move { n * 2 }, |n, _| n)
            .await;
        outputs.sort_unstable();
        assert_eq!(outputs, (0..50u32).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pool = WorkerPool::new(3, 4);
        let (in_flight_w, peak_w) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let outputs = pool
            .run(
                (0..20u32).collect(),
                move |n| {
                    let in_flight = Arc::clone(&in_flight_w);
                    let peak = Arc::clone(&peak_w);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        n
                    }
                },
                |n, _| n,
            )
            .await;

        assert_eq!(outputs.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    /// Send but not Sync, like a value holding a `Cell`
    #[derive(Debug, Clone)]
    struct Unshared(std::cell::Cell<u32>);

    #[tokio::test]
    async fn test_items_only_need_to_be_send() {
        let pool = WorkerPool::new(2, 2);
        let mut outputs = pool
            .run(
                (1..=4u32).map(|n| Unshared(std::cell::Cell::new(n))).collect(),
                |item: Unshared| async move { item.0.get() * 10 },
                |item, _| item.0.get(),
            )
            .await;
        outputs.sort_unstable();
        assert_eq!(outputs, vec![10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn test_panicking_item_still_produces_output() {
        let pool = WorkerPool::new(2, 2);
        let outputs: Vec<Result<u32, String>> = pool
            .run(
                (0..6u32).collect(),
                |n| async move {
                    if n == 4 {
                        panic!("item four exploded");
                    }
                    Ok(n)
                },
                |_, reason| Err(reason),
            )
            .await;

        assert_eq!(outputs.len(), 6);
        let failures: Vec<_> = outputs.iter().filter_map(|o| o.as_ref().err()).collect();
        assert_eq!(failures, vec!["item four exploded"]);
    }
}
