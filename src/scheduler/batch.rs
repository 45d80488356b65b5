use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::scheduler::job::{Invocation, Job};

/// One entry of a JSON job file.
///
/// ```json
/// [
///   { "program": "bin/linux-x64/ntc-cli",
///     "args": ["--loadImages", "textures/brick", "--compress", "--bitsPerPixel", "4"],
///     "bits_per_pixel": 4.0,
///     "label": "brick@4" }
/// ]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    #[serde(flatten)]
    pub invocation: Invocation,
    #[serde(default)]
    pub label: Option<String>,
}

/// Parse a job file body into labelled jobs, in file order.
///
/// Jobs without a label are named `job-<index>`.
pub fn parse_job_file(text: &str) -> Result<Vec<Job<String>>> {
    let specs: Vec<JobSpec> = serde_json::from_str(text)?;
    Ok(specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let label = spec.label.unwrap_or_else(|| format!("job-{}", index));
            Job::new(spec.invocation, label)
        })
        .collect())
}

pub async fn load_job_file(path: &Path) -> Result<Vec<Job<String>>> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_job_file(&text)
}
