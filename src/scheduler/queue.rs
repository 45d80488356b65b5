use std::collections::VecDeque;

use uuid::Uuid;

use crate::scheduler::job::Job;

/// Pending jobs in claim order.
///
/// The queue only ever shrinks from the front; a claimed job is never put
/// back. Shared between workers behind a `tokio::sync::Mutex`.
#[derive(Debug)]
pub struct JobQueue<T> {
    jobs: VecDeque<Job<T>>,
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            jobs: VecDeque::new(),
        }
    }

    pub fn add_job(&mut self, job: Job<T>) {
        self.jobs.push_back(job);
    }

    /// Remove and return the front job, or `None` once the queue is drained.
    pub fn take_next(&mut self) -> Option<Job<T>> {
        self.jobs.pop_front()
    }

    /// Ids of the jobs that have not been claimed yet, front first.
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.jobs.iter().map(|j| j.id).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl<T> FromIterator<Job<T>> for JobQueue<T> {
    fn from_iter<I: IntoIterator<Item = Job<T>>>(iter: I) -> Self {
        Self {
            jobs: iter.into_iter().collect(),
        }
    }
}
