//! Job execution on device slots.
//!
//! - [`JobRunner`]: launches the tool for one job and parses its output
//! - [`Worker`]: claim loop for one device slot
//!
//! # Execution Flow
//!
//! 1. Worker claims the front job from the shared queue
//! 2. The job is bound to the worker's device
//! 3. [`JobRunner::execute`] spawns the tool and waits for it
//! 4. Standard output is folded into a [`RunResult`](crate::result::RunResult)
//! 5. The completion handler runs under the run-wide serialization lock

pub mod executor;
pub mod slot;

pub use executor::JobRunner;
pub use slot::{StopReason, Worker, WorkerReport, WorkerState};
