//! Bounded FIFO admission queue with per-entry expiry (§4.8, §5).

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::sync::{mpsc, oneshot};

use crate::error::{LlmError, Result};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// One admitted unit of work: the job to run once dequeued, the instant it
/// expires, and the single-use channel its waiter listens on.
struct Entry<T> {
    deadline: Instant,
    job: Box<dyn FnOnce() -> BoxFuture<Result<T>> + Send>,
    respond: oneshot::Sender<Result<T>>,
}

/// Bounded producer side of the queue. Cloned freely; the bound channel and
/// the pause flag are shared.
#[derive(Clone)]
pub struct AdmissionQueue<T> {
    sender: mpsc::Sender<Entry<T>>,
    paused: Arc<AtomicBool>,
}

impl<T: Send + 'static> AdmissionQueue<T> {
    /// Spawns `workers` consumer tasks, each running an infinite
    /// dequeue-then-dispatch loop, and returns the producer handle.
    pub fn spawn(capacity: usize, workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let paused = Arc::new(AtomicBool::new(false));

        for _ in 0..workers {
            let receiver = receiver.clone();
            let paused = paused.clone();

            tokio::spawn(async move {
                loop {
                    let entry = {
                        let mut receiver = receiver.lock().await;
                        receiver.recv().await
                    };

                    let Some(entry) = entry else { return };

                    if paused.load(Ordering::Acquire) {
                        let _ = entry.respond.send(Err(LlmError::Overloaded(
                            "admission queue is paused".to_string(),
                        )));
                        continue;
                    }

                    if Instant::now() >= entry.deadline {
                        let _ = entry.respond.send(Err(LlmError::Timeout));
                        continue;
                    }

                    let result = (entry.job)().await;
                    let _ = entry.respond.send(result);
                }
            });
        }

        Self { sender, paused }
    }

    /// Enqueues `job`, to run within `max_wait` of now, and awaits its
    /// result. Fails immediately (dropping the request) if the queue is full.
    pub async fn submit<F>(&self, max_wait: Duration, job: F) -> Result<T>
    where
        F: FnOnce() -> BoxFuture<Result<T>> + Send + 'static,
    {
        let (respond, receiver) = oneshot::channel();
        let entry = Entry {
            deadline: Instant::now() + max_wait,
            job: Box::new(job),
            respond,
        };

        self.sender
            .try_send(entry)
            .map_err(|_| LlmError::Overloaded("admission queue is full".to_string()))?;

        receiver.await.unwrap_or(Err(LlmError::Overloaded(
            "admission worker dropped the request".to_string(),
        )))
    }

    /// Stops workers from dispatching newly dequeued entries; entries
    /// already queued are neither dropped nor drained, just rejected as
    /// they're popped, matching "pause drains nothing" (§4.8).
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submits_and_runs_job() {
        let queue: AdmissionQueue<u32> = AdmissionQueue::spawn(4, 2);

        let result = queue
            .submit(Duration::from_secs(1), || Box::pin(async { Ok(42) }))
            .await
            .unwrap();

        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn full_queue_rejects_new_submissions() {
        let queue: AdmissionQueue<u32> = AdmissionQueue::spawn(1, 0);

        // No workers running, so the one slot fills and stays full.
        let first = queue.submit(Duration::from_secs(5), || Box::pin(async { Ok(1) }));
        tokio::pin!(first);

        // Poll once to push the entry into the channel without awaiting completion.
        let _ = futures::poll!(&mut first);

        let second = queue
            .submit(Duration::from_millis(1), || Box::pin(async { Ok(2) }))
            .await;

        assert!(second.is_err());
    }

    #[tokio::test]
    async fn paused_queue_rejects_dequeued_entries() {
        let queue: AdmissionQueue<u32> = AdmissionQueue::spawn(4, 1);
        queue.pause();

        let result = queue
            .submit(Duration::from_secs(1), || Box::pin(async { Ok(7) }))
            .await;

        assert!(result.is_err());
    }
}
