pub mod config;
pub mod dispatcher;
pub mod error;
pub mod parser;
pub mod report;
pub mod result;
pub mod scheduler;
pub mod shutdown;
pub mod worker;

pub use dispatcher::{DispatchSummary, Dispatcher};
pub use error::{DispatchError, ProcessFailure, Result};
pub use result::{ExperimentRun, RunResult};
pub use scheduler::{Invocation, Job};
