//! Interpretation of ntc-cli standard output.
//!
//! - [`classify`] turns a single line into a typed [`Event`]
//! - [`ResultAccumulator`] folds a job's events into a [`RunResult`](crate::result::RunResult)

pub mod accumulator;
pub mod classify;

pub use accumulator::{parse_output, ResultAccumulator};
pub use classify::{classify, parse_metric, Event, QualityKind, TimingSource};
