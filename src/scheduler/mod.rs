pub mod batch;
pub mod job;
pub mod queue;

pub use batch::{load_job_file, parse_job_file, JobSpec};
pub use job::{Invocation, Job};
pub use queue::JobQueue;
