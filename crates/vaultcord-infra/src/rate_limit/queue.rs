//! Global FIFO request queue and its single processor loop.

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use super::memory::Shared;

/// How a queued task ended, as seen by the processor.
#[derive(Debug)]
pub(crate) enum TaskOutcome {
    Succeeded,
    Failed(String),
}

/// A request waiting for its turn.
///
/// `operation` runs the caller's closure and settles the caller's oneshot
/// channel with the result before reporting the outcome to the processor.
pub(crate) struct QueuedTask {
    pub(crate) endpoint: String,
    pub(crate) operation: BoxFuture<'static, TaskOutcome>,
}

impl QueuedTask {
    pub(crate) fn new<T, E, F, Fut>(
        endpoint: String,
        operation: F,
    ) -> (Self, oneshot::Receiver<Result<T, E>>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (on_settled, settled) = oneshot::channel();

        let operation = async move {
            let result = operation().await;
            let outcome = match &result {
                Ok(_) => TaskOutcome::Succeeded,
                Err(e) => TaskOutcome::Failed(e.to_string()),
            };
            // The caller may have stopped waiting; the task still counts as run
            let _ = on_settled.send(result);
            outcome
        }
        .boxed();

        (
            Self {
                endpoint,
                operation,
            },
            settled,
        )
    }
}

/// Pending tasks plus the processor flag, guarded by one lock so a task can
/// never be enqueued between the processor seeing an empty queue and stopping.
#[derive(Default)]
pub(crate) struct QueueState {
    pub(crate) tasks: VecDeque<QueuedTask>,
    pub(crate) processing: bool,
}

/// Clears the processor flag when a processor is dropped before it drained
/// the queue (its runtime shut down), so the next enqueue starts a new one.
struct ProcessorGuard {
    shared: Arc<Shared>,
    drained: bool,
}

impl Drop for ProcessorGuard {
    fn drop(&mut self) {
        if !self.drained {
            self.shared.processor_lost();
        }
    }
}

/// Drain the queue one task at a time until it is empty.
///
/// The guard is created before the first poll, so a processor future that is
/// dropped unpolled still releases the flag.
pub(crate) fn process_queue(shared: Arc<Shared>) -> impl Future<Output = ()> + Send + 'static {
    let mut guard = ProcessorGuard {
        shared,
        drained: false,
    };

    async move {
        let shared = guard.shared.clone();
        tracing::debug!("Request queue processor started");

        loop {
            let Some(task) = shared.next_task() else {
                guard.drained = true;
                break;
            };

            let wait = shared.wait_time(&task.endpoint);
            if !wait.is_zero() {
                tracing::info!(
                    endpoint = %task.endpoint,
                    wait_ms = wait.as_millis() as u64,
                    "Endpoint rate limited, delaying queued request"
                );
                tokio::time::sleep(wait).await;
            }

            shared.acquire_global_permit().await;

            // Run on its own task so a panic stays inside the JoinError
            match tokio::spawn(task.operation).await {
                Ok(TaskOutcome::Succeeded) => {
                    tracing::debug!(endpoint = %task.endpoint, "Queued request completed");
                }
                Ok(TaskOutcome::Failed(reason)) => {
                    tracing::warn!(endpoint = %task.endpoint, reason = %reason, "Queued request failed");
                }
                Err(e) if e.is_panic() => {
                    tracing::error!(endpoint = %task.endpoint, "Queued request panicked");
                }
                Err(e) => {
                    tracing::warn!(endpoint = %task.endpoint, error = %e, "Queued request cancelled");
                }
            }
        }

        tracing::debug!("Request queue processor idle");
    }
}
