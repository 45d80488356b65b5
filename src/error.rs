use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error type returned by user completion callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Invalid job at index {index}: {reason}")]
    InvalidJob { index: usize, reason: String },

    #[error("No device slots configured")]
    NoDevices,

    #[error("Device {0} is listed more than once")]
    DuplicateDevice(u32),

    #[error("Job is already bound to device {0}")]
    DeviceAlreadyBound(u32),

    #[error("Failed to launch {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] ProcessFailure),

    #[error("Completion callback failed: {0}")]
    Callback(CallbackError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid job file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// A job whose process ran but did not exit cleanly.
///
/// Both output streams are kept verbatim so the failure can be diagnosed
/// without re-running the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    pub command: Vec<String>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => writeln!(f, "The following command failed with code {}:", code)?,
            None => writeln!(f, "The following command was terminated by a signal:")?,
        }
        writeln!(f, "> {}", self.command.join(" "))?;
        if !self.stdout.is_empty() {
            write!(f, "stdout:\n{}", self.stdout)?;
        }
        if !self.stderr.is_empty() {
            write!(f, "stderr:\n{}", self.stderr)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProcessFailure {}
