use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DispatchError, Result};

/// What to launch for a job: the tool, its arguments and the rate the
/// arguments ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// Used as the result's bits-per-pixel when the tool does not report one.
    #[serde(default, alias = "bits_per_pixel")]
    pub expected_bits_per_pixel: Option<f64>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            expected_bits_per_pixel: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_expected_rate(mut self, bits_per_pixel: f64) -> Self {
        self.expected_bits_per_pixel = Some(bits_per_pixel);
        self
    }

    /// Check the invocation is launchable. Returns the reason when it is not.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.program.as_os_str().is_empty() {
            return Err("program path is empty".to_string());
        }
        if let Some(position) = self.args.iter().position(|a| a.is_empty()) {
            return Err(format!("argument {} is empty", position));
        }
        if let Some(bpp) = self.expected_bits_per_pixel {
            if !bpp.is_finite() || bpp <= 0.0 {
                return Err(format!("expected bits per pixel must be positive, got {}", bpp));
            }
        }
        Ok(())
    }
}

/// One unit of work, bound to a single process invocation.
///
/// The payload is carried through untouched to the completion handler.
/// The device slot is written once, by the worker that claims the job.
#[derive(Debug, Clone)]
pub struct Job<T = ()> {
    pub id: Uuid,
    pub invocation: Invocation,
    pub payload: T,
    pub created_at: DateTime<Utc>,
    device: Option<u32>,
}

impl<T> Job<T> {
    pub fn new(invocation: Invocation, payload: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            invocation,
            payload,
            created_at: Utc::now(),
            device: None,
        }
    }

    /// Device the job was claimed on, if it has been claimed.
    pub fn device(&self) -> Option<u32> {
        self.device
    }

    pub(crate) fn bind_device(&mut self, device: u32) -> Result<()> {
        if let Some(bound) = self.device {
            return Err(DispatchError::DeviceAlreadyBound(bound));
        }
        self.device = Some(device);
        Ok(())
    }

    /// Full argv, including the device selection when the job is bound.
    pub fn command_line(&self, device_flag: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.invocation.args.len() + 3);
        argv.push(self.invocation.program.to_string_lossy().into_owned());
        argv.extend(self.invocation.args.iter().cloned());
        if let Some(device) = self.device {
            argv.push(device_flag.to_string());
            argv.push(device.to_string());
        }
        argv
    }
}

impl From<Invocation> for Job<()> {
    fn from(invocation: Invocation) -> Self {
        Job::new(invocation, ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_device_is_write_once() {
        let mut job = Job::from(Invocation::new("ntc-cli"));
        assert_eq!(job.device(), None);

        job.bind_device(1).unwrap();
        assert_eq!(job.device(), Some(1));

        let err = job.bind_device(2).unwrap_err();
        assert!(matches!(err, DispatchError::DeviceAlreadyBound(1)));
        assert_eq!(job.device(), Some(1));
    }

    #[test]
    fn command_line_appends_device_once_bound() {
        let mut job = Job::from(Invocation::new("ntc-cli").args(["--compress", "--loadImages", "in"]));
        assert_eq!(
            job.command_line("--cudaDevice"),
            vec!["ntc-cli", "--compress", "--loadImages", "in"]
        );

        job.bind_device(3).unwrap();
        assert_eq!(
            job.command_line("--cudaDevice"),
            vec!["ntc-cli", "--compress", "--loadImages", "in", "--cudaDevice", "3"]
        );
    }
}
