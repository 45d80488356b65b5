use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::config::RunnerConfig;
use crate::error::{DispatchError, ProcessFailure, Result};
use crate::parser::ResultAccumulator;
use crate::result::RunResult;
use crate::scheduler::Job;

/// Runs one job's tool invocation and interprets its output.
///
/// Each call spawns exactly one process and waits for it to exit. Both
/// output streams are captured in full. There is no retry and no timeout;
/// the process decides how long a job takes.
#[derive(Debug, Clone, Default)]
pub struct JobRunner {
    config: RunnerConfig,
}

impl JobRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Execute the job and parse its standard output into a [`RunResult`].
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Spawn`] if the program could not be started
    /// - [`DispatchError::Process`] if it exited with a non-zero status or
    ///   was killed by a signal
    pub async fn execute<T>(&self, job: &Job<T>) -> Result<RunResult> {
        let command = job.command_line(&self.config.device_flag);
        tracing::info!(
            job_id = %job.id,
            device = ?job.device(),
            command = %command.join(" "),
            "Executing job"
        );

        let started = Instant::now();
        let output = Command::new(&job.invocation.program)
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| {
                tracing::error!(job_id = %job.id, error = %source, "Failed to launch job");
                DispatchError::Spawn {
                    program: job.invocation.program.clone(),
                    source,
                }
            })?;
        let elapsed = started.elapsed();

        Self::process_output(job, command, output, elapsed)
    }

    fn process_output<T>(
        job: &Job<T>,
        command: Vec<String>,
        output: std::process::Output,
        elapsed: Duration,
    ) -> Result<RunResult> {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let exit_code = output.status.code();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::debug!(job_id = %job.id, exit_code = ?exit_code, "Job process failed");
            return Err(ProcessFailure {
                command,
                exit_code,
                stdout,
                stderr,
            }
            .into());
        }

        let mut accumulator = ResultAccumulator::new()
            .with_expected_rate(job.invocation.expected_bits_per_pixel)
            .with_elapsed(elapsed);
        for line in stdout.lines() {
            accumulator.push_line(line);
        }
        let result = accumulator.finish();

        tracing::info!(
            job_id = %job.id,
            elapsed_ms = elapsed.as_millis() as u64,
            experiments = result.experiments.len(),
            "Job completed"
        );

        Ok(result)
    }
}
