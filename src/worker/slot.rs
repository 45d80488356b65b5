use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{CallbackError, DispatchError, Result};
use crate::result::RunResult;
use crate::scheduler::{Job, JobQueue};
use crate::worker::executor::JobRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopped,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "idle"),
            WorkerState::Running => write!(f, "running"),
            WorkerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why a worker left its claim loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QueueDrained,
    Cancelled,
    JobFailed,
    CallbackFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::QueueDrained => write!(f, "queue drained"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::JobFailed => write!(f, "job failed"),
            StopReason::CallbackFailed => write!(f, "callback failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub device: u32,
    /// Jobs this worker finished, callback included.
    pub completed: usize,
    pub reason: StopReason,
}

struct Completion<F> {
    handler: F,
    completed: usize,
}

/// State shared by all workers of one dispatch run.
///
/// The completion mutex is the callback-serialization lock: it owns both the
/// user handler and the completed counter, so neither can be touched outside it.
pub(crate) struct RunState<T, F> {
    queue: Mutex<JobQueue<T>>,
    completion: Mutex<Completion<F>>,
    cancel: CancellationToken,
    total: usize,
}

impl<T, F> RunState<T, F>
where
    F: FnMut(&Job<T>, &RunResult, usize, usize) -> std::result::Result<(), CallbackError>,
{
    pub(crate) fn new(queue: JobQueue<T>, handler: F, cancel: CancellationToken) -> Self {
        let total = queue.len();
        Self {
            queue: Mutex::new(queue),
            completion: Mutex::new(Completion {
                handler,
                completed: 0,
            }),
            cancel,
            total,
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.total
    }

    pub(crate) async fn completed(&self) -> usize {
        self.completion.lock().await.completed
    }

    pub(crate) async fn unclaimed(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn claim(&self) -> Option<Job<T>> {
        self.queue.lock().await.take_next()
    }

    async fn complete(&self, job: &Job<T>, result: &RunResult) -> Result<()> {
        let mut guard = self.completion.lock().await;
        let completion = &mut *guard;
        completion.completed += 1;
        let completed = completion.completed;
        (completion.handler)(job, result, self.total, completed).map_err(DispatchError::Callback)
    }
}

/// One claim loop bound to a single device slot.
pub struct Worker<T, F> {
    device: u32,
    runner: JobRunner,
    state: Arc<RunState<T, F>>,
}

impl<T, F> Worker<T, F>
where
    T: Send + Sync + 'static,
    F: FnMut(&Job<T>, &RunResult, usize, usize) -> std::result::Result<(), CallbackError>
        + Send
        + 'static,
{
    pub(crate) fn new(device: u32, runner: JobRunner, state: Arc<RunState<T, F>>) -> Self {
        Self {
            device,
            runner,
            state,
        }
    }

    /// Claim and run jobs until the queue drains, a job or callback fails,
    /// or cancellation is observed before the next claim.
    ///
    /// A job that has been claimed always runs to completion; cancellation is
    /// only checked between jobs.
    pub async fn run(self) -> WorkerReport {
        let mut completed = 0;
        self.transition(WorkerState::Idle);

        let reason = loop {
            if self.state.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let Some(mut job) = self.state.claim().await else {
                break StopReason::QueueDrained;
            };

            if let Err(e) = job.bind_device(self.device) {
                tracing::error!(job_id = %job.id, device = self.device, error = %e, "Refusing to rebind job");
                self.state.cancel.cancel();
                break StopReason::JobFailed;
            }
            self.transition(WorkerState::Running);

            let result = match self.runner.execute(&job).await {
                Ok(result) => result,
                Err(e) => {
                    self.report_failure(&job, &e);
                    self.state.cancel.cancel();
                    break StopReason::JobFailed;
                }
            };

            if let Err(e) = self.state.complete(&job, &result).await {
                tracing::error!(job_id = %job.id, device = self.device, error = %e, "Completion callback failed");
                self.state.cancel.cancel();
                break StopReason::CallbackFailed;
            }

            completed += 1;
            self.transition(WorkerState::Idle);
        };

        self.transition(WorkerState::Stopped);
        tracing::debug!(device = self.device, completed, reason = %reason, "Worker stopped");

        WorkerReport {
            device: self.device,
            completed,
            reason,
        }
    }

    fn transition(&self, state: WorkerState) {
        tracing::debug!(device = self.device, state = %state, "Worker state");
    }

    // Only the first failure of a run is worth shouting about; anything after
    // cancellation is usually fallout from the same interrupt.
    fn report_failure(&self, job: &Job<T>, error: &DispatchError) {
        if self.state.cancel.is_cancelled() {
            tracing::debug!(job_id = %job.id, device = self.device, error = %error, "Job failed after cancellation");
        } else {
            tracing::error!(job_id = %job.id, device = self.device, error = %error, "Job failed");
        }
    }
}
