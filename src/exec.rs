//! Execution Driver - Launch The Host, Wait, Report
//!
//! The generated script already isolates per-record and per-instruction
//! failures, so the driver's whole job is a platform-correct launch and a
//! single bounded wait. On timeout the run fails; the host process is
//! left alone (no cancellation channel exists beyond the ceiling).

use std::path::Path;
use std::process::Command;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::config::HostPlatform;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to launch host application: {0}")]
    Launch(std::io::Error),

    #[error("Failed while waiting on host application: {0}")]
    Wait(std::io::Error),

    #[error("Host application exited with status {0}")]
    HostExit(i32),

    #[error("Host application did not finish within {0:?}")]
    Timeout(Duration),
}

/// Platform-specific invocation of the host application, selected once
/// at startup instead of branching at every call site.
#[derive(Debug, Clone)]
pub enum HostLauncher {
    /// `osascript` tells the named application to run the script file.
    Macos { app: String },
    /// The host executable is invoked directly with the script path.
    Windows { app: String },
}

impl HostLauncher {
    pub fn for_platform(platform: HostPlatform, app: impl Into<String>) -> Self {
        match platform {
            HostPlatform::Macos => Self::Macos { app: app.into() },
            HostPlatform::Windows => Self::Windows { app: app.into() },
        }
    }

    pub fn command(&self, script: &Path) -> Command {
        match self {
            HostLauncher::Macos { app } => {
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(format!(
                    "tell application \"{}\" to do javascript file \"{}\"",
                    app,
                    script.display()
                ));
                cmd
            }
            HostLauncher::Windows { app } => {
                let mut cmd = Command::new(app);
                cmd.arg(script);
                cmd
            }
        }
    }

    /// Hand the script to the host and block until it finishes or the
    /// ceiling is hit. No retry, no kill on timeout.
    pub fn run_script(&self, script: &Path, timeout: Duration) -> Result<(), ExecError> {
        info!(script = %script.display(), ?timeout, "handing script to host application");
        run_with_deadline(self.command(script), timeout)
    }
}

fn run_with_deadline(mut cmd: Command, timeout: Duration) -> Result<(), ExecError> {
    let deadline = Instant::now() + timeout;
    let mut child = cmd.spawn().map_err(ExecError::Launch)?;
    loop {
        if let Some(status) = child.try_wait().map_err(ExecError::Wait)? {
            if status.success() {
                return Ok(());
            }
            return Err(ExecError::HostExit(status.code().unwrap_or(-1)));
        }
        if Instant::now() >= deadline {
            return Err(ExecError::Timeout(timeout));
        }
        std::thread::sleep(Duration::from_millis(250));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::path::PathBuf;

    #[test]
    fn macos_launcher_goes_through_osascript() {
        let launcher = HostLauncher::for_platform(HostPlatform::Macos, "Adobe Photoshop 2024");
        let cmd = launcher.command(&PathBuf::from("/work/run.jsx"));
        assert_eq!(cmd.get_program(), OsStr::new("osascript"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "-e");
        assert!(args[1].contains("Adobe Photoshop 2024"));
        assert!(args[1].contains("/work/run.jsx"));
    }

    #[test]
    fn windows_launcher_invokes_host_directly() {
        let launcher = HostLauncher::for_platform(
            HostPlatform::Windows,
            r"C:\Program Files\Adobe\Photoshop.exe",
        );
        let cmd = launcher.command(&PathBuf::from(r"C:\work\run.jsx"));
        assert_eq!(
            cmd.get_program(),
            OsStr::new(r"C:\Program Files\Adobe\Photoshop.exe")
        );
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec![OsStr::new(r"C:\work\run.jsx")]);
    }

    #[cfg(unix)]
    #[test]
    fn unspawnable_command_is_a_launch_error() {
        let cmd = Command::new("/nonexistent/host-app");
        let result = run_with_deadline(cmd, Duration::from_secs(1));
        assert!(matches!(result, Err(ExecError::Launch(_))));
    }

    #[cfg(unix)]
    #[test]
    fn deadline_exceeded_is_a_timeout_error() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let result = run_with_deadline(cmd, Duration::from_millis(100));
        assert!(matches!(result, Err(ExecError::Timeout(_))));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_surfaced() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "exit 3"]);
        let result = run_with_deadline(cmd, Duration::from_secs(5));
        assert!(matches!(result, Err(ExecError::HostExit(3))));
    }

    #[cfg(unix)]
    #[test]
    fn success_is_ok() {
        let cmd = Command::new("true");
        assert!(run_with_deadline(cmd, Duration::from_secs(5)).is_ok());
    }
}
