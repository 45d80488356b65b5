use std::time::Duration;

use serde::Serialize;

use crate::result::RunResult;

/// Batch progress as seen from the completion handler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl Progress {
    pub fn new(completed: usize, total: usize, elapsed: Duration) -> Self {
        Self {
            completed,
            total,
            elapsed,
        }
    }

    /// Estimated time left, assuming the remaining jobs take as long on
    /// average as the finished ones.
    pub fn eta(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.completed) as f64;
        let per_job = self.elapsed.as_secs_f64() / self.completed as f64;
        Some(Duration::from_secs_f64(remaining * per_job))
    }

    pub fn status_line(&self) -> String {
        let eta = self
            .eta()
            .map(format_duration)
            .unwrap_or_else(|| "--:--:--".to_string());
        format!("Done: {} / {}, ETA: {}", self.completed, self.total, eta)
    }
}

/// `H:MM:SS`, whole seconds.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// One printed row per completed job.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRow {
    pub label: String,
    pub device: Option<u32>,
    #[serde(serialize_with = "crate::result::metric::option::serialize")]
    pub overall_psnr: Option<f64>,
    #[serde(serialize_with = "crate::result::metric::option::serialize")]
    pub bits_per_pixel: Option<f64>,
    pub elapsed_secs: f64,
}

impl CompletionRow {
    pub fn new(label: impl Into<String>, device: Option<u32>, result: &RunResult) -> Self {
        Self {
            label: label.into(),
            device,
            overall_psnr: result.overall_psnr,
            bits_per_pixel: result.bits_per_pixel,
            elapsed_secs: result.elapsed_secs(),
        }
    }

    pub fn to_table_row(&self) -> String {
        let metric = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();
        let device = self.device.map(|d| d.to_string()).unwrap_or_default();
        format!(
            "{:<32} {:>6} {:>8} {:>8} {:>8.2}",
            self.label,
            device,
            metric(self.overall_psnr),
            metric(self.bits_per_pixel),
            self.elapsed_secs
        )
    }
}

pub fn table_header() -> String {
    format!(
        "{:<32} {:>6} {:>8} {:>8} {:>8}",
        "JOB", "DEVICE", "PSNR", "BPP", "SECONDS"
    )
}
