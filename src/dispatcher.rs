//! Fan a batch of jobs out across device slots.
//!
//! One [`Worker`] is launched per configured device. Workers pull jobs from a
//! shared FIFO, so a slot that finishes early simply claims more work. Every
//! completion is reported through a single handler, one call at a time.
//!
//! # Stopping
//!
//! The run stops early when a job fails, the handler returns an error, the
//! caller's token is cancelled, or Ctrl-C is received. Stopping is
//! cooperative: jobs that are already running finish and are reported before
//! their worker notices.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::DispatcherConfig;
use crate::error::{CallbackError, DispatchError, Result};
use crate::result::RunResult;
use crate::scheduler::{Job, JobQueue};
use crate::shutdown::install_interrupt_handler;
use crate::worker::slot::RunState;
use crate::worker::{JobRunner, Worker, WorkerReport};

/// Outcome of one [`Dispatcher::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    /// True when the run was cancelled, by the user or by a failure.
    pub aborted: bool,
    pub total: usize,
    pub completed: usize,
    /// Jobs never claimed because the run stopped early.
    pub unclaimed: usize,
    pub workers: Vec<WorkerReport>,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatcherConfig,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop runs through a caller-owned token in addition to Ctrl-C.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run every job and call `on_complete(job, result, total, completed)`
    /// after each success.
    ///
    /// `completed` counts this call, so it runs from 1 to `total` on a full
    /// run. The handler is never called concurrently with itself.
    ///
    /// # Errors
    ///
    /// Only validation problems and a failure to install the interrupt
    /// handler are returned as errors, before any process is spawned. Job and
    /// handler failures stop the run and are reported through `tracing`; the
    /// summary's `aborted` flag tells the caller.
    pub async fn run<T, F>(&self, jobs: Vec<Job<T>>, on_complete: F) -> Result<DispatchSummary>
    where
        T: Send + Sync + 'static,
        F: FnMut(&Job<T>, &RunResult, usize, usize) -> std::result::Result<(), CallbackError>
            + Send
            + 'static,
    {
        validate(&self.config.devices, &jobs)?;

        // A child token keeps one run's failure from cancelling later runs,
        // while cancelling the dispatcher's token still reaches this run.
        let cancel = self.cancel.child_token();
        let state = Arc::new(RunState::new(
            jobs.into_iter().collect::<JobQueue<T>>(),
            on_complete,
            cancel.clone(),
        ));
        let total = state.total();

        tracing::info!(
            jobs = total,
            devices = ?self.config.devices,
            "Starting dispatch"
        );

        let _interrupt = if self.config.handle_interrupt {
            Some(install_interrupt_handler(cancel.clone())?)
        } else {
            None
        };

        let handles: Vec<_> = self
            .config
            .devices
            .iter()
            .map(|&device| {
                let runner = JobRunner::new(self.config.runner.clone());
                let worker = Worker::new(device, runner, state.clone());
                (device, tokio::spawn(worker.run()))
            })
            .collect();

        let mut workers = Vec::with_capacity(handles.len());
        for (device, handle) in handles {
            match handle.await {
                Ok(report) => workers.push(report),
                Err(e) => {
                    tracing::error!(device, error = %e, "Worker task terminated abnormally");
                    cancel.cancel();
                }
            }
        }

        let summary = DispatchSummary {
            aborted: cancel.is_cancelled(),
            total,
            completed: state.completed().await,
            unclaimed: state.unclaimed().await,
            workers,
        };

        if summary.aborted {
            tracing::warn!(
                completed = summary.completed,
                total,
                unclaimed = summary.unclaimed,
                "Dispatch aborted"
            );
        } else {
            tracing::info!(completed = summary.completed, total, "Dispatch finished");
        }

        Ok(summary)
    }
}

/// Reject a batch that cannot be launched as a whole.
pub fn validate<T>(devices: &[u32], jobs: &[Job<T>]) -> Result<()> {
    if devices.is_empty() {
        return Err(DispatchError::NoDevices);
    }

    let mut seen = HashSet::with_capacity(devices.len());
    for &device in devices {
        if !seen.insert(device) {
            return Err(DispatchError::DuplicateDevice(device));
        }
    }

    for (index, job) in jobs.iter().enumerate() {
        job.invocation
            .validate()
            .map_err(|reason| DispatchError::InvalidJob { index, reason })?;

        if let Some(device) = job.device() {
            return Err(DispatchError::InvalidJob {
                index,
                reason: format!("already bound to device {}", device),
            });
        }
    }

    Ok(())
}
