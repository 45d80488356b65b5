use std::path::{Path, PathBuf};

/// Configuration for launching the external tool.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Flag used to pass the device slot to the tool (e.g. "--cudaDevice").
    pub device_flag: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            device_flag: "--cudaDevice".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Device slots, one worker per entry.
    pub devices: Vec<u32>,
    pub runner: RunnerConfig,
    /// Listen for Ctrl-C while a batch is running.
    /// When false, only the caller's cancellation token stops the run.
    pub handle_interrupt: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            devices: vec![0],
            runner: RunnerConfig::default(),
            handle_interrupt: true,
        }
    }
}

impl DispatcherConfig {
    pub fn new(devices: Vec<u32>) -> Self {
        Self {
            devices,
            ..Default::default()
        }
    }

    pub fn with_device_flag(mut self, flag: impl Into<String>) -> Self {
        self.runner.device_flag = flag.into();
        self
    }

    pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
        self.handle_interrupt = enabled;
        self
    }
}

/// Location of the ntc-cli executable inside an SDK checkout.
pub fn default_tool_path(sdk_root: &Path) -> PathBuf {
    let relative = if cfg!(windows) {
        "bin/windows-x64/ntc-cli.exe"
    } else {
        "bin/linux-x64/ntc-cli"
    };
    sdk_root.join(relative)
}
