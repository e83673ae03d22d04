//! External processes: launcher detection, uv install, host restart, browser.

use std::process::{Command, ExitStatus};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::paths::Platform;

/// Launcher binary used for python packages.
pub const PYTHON_LAUNCHER: &str = "uvx";

pub trait CommandRunner {
    /// Whether `binary` can be found on PATH.
    fn binary_available(&self, binary: &str) -> bool;

    /// Install the uv toolchain (provides `uvx`).
    fn install_uv(&self) -> Result<(), RunnerError>;

    /// Quit and relaunch the host application.
    fn restart_host(&self) -> Result<(), RunnerError>;

    fn open_url(&self, url: &str) -> Result<(), RunnerError>;
}

/// Runs real commands for one platform family.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    platform: Platform,
    relaunch_delay: Duration,
}

impl SystemRunner {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            relaunch_delay: Duration::from_secs(2),
        }
    }

    pub fn current() -> Self {
        Self::new(Platform::current())
    }
}

impl CommandRunner for SystemRunner {
    fn binary_available(&self, binary: &str) -> bool {
        which::which(binary).is_ok()
    }

    fn install_uv(&self) -> Result<(), RunnerError> {
        run_to_completion(&uv_install_command(self.platform))
    }

    fn restart_host(&self) -> Result<(), RunnerError> {
        let commands = restart_commands(self.platform);

        // Quitting fails when the app isn't running; relaunch anyway.
        if let Err(e) = run_to_completion(&commands.quit) {
            debug!(error = %e, "quit step did not succeed");
        }
        thread::sleep(self.relaunch_delay);

        // The app keeps running after we exit, so don't wait on it.
        let (program, args) = split(&commands.launch)?;
        Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: commands.launch.join(" "),
                source,
            })?;
        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<(), RunnerError> {
        run_to_completion(&open_url_command(self.platform, url))
    }
}

/// Quit and launch command lines for the host app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartCommands {
    pub quit: Vec<String>,
    pub launch: Vec<String>,
}

pub fn restart_commands(platform: Platform) -> RestartCommands {
    let (quit, launch): (&[&str], &[&str]) = match platform {
        Platform::Windows => (
            &["taskkill", "/F", "/IM", "Claude.exe"],
            &["cmd", "/C", "start", "", "Claude.exe"],
        ),
        Platform::MacOs => (&["killall", "Claude"], &["open", "-a", "Claude"]),
        Platform::Linux => (&["pkill", "-x", "claude"], &["claude"]),
    };
    RestartCommands {
        quit: quit.iter().map(|s| s.to_string()).collect(),
        launch: launch.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn open_url_command(platform: Platform, url: &str) -> Vec<String> {
    let prefix: &[&str] = match platform {
        Platform::Windows => &["cmd", "/C", "start", ""],
        Platform::MacOs => &["open"],
        Platform::Linux => &["xdg-open"],
    };
    prefix
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(url.to_string()))
        .collect()
}

pub fn uv_install_command(platform: Platform) -> Vec<String> {
    let argv: &[&str] = match platform {
        Platform::Windows => &[
            "powershell",
            "-ExecutionPolicy",
            "ByPass",
            "-c",
            "irm https://astral.sh/uv/install.ps1 | iex",
        ],
        Platform::MacOs | Platform::Linux => {
            &["sh", "-c", "curl -LsSf https://astral.sh/uv/install.sh | sh"]
        }
    };
    argv.iter().map(|s| s.to_string()).collect()
}

fn split(argv: &[String]) -> Result<(&str, &[String]), RunnerError> {
    match argv.split_first() {
        Some((program, args)) => Ok((program.as_str(), args)),
        None => Err(RunnerError::EmptyCommand),
    }
}

fn run_to_completion(argv: &[String]) -> Result<(), RunnerError> {
    let (program, args) = split(argv)?;
    let command = argv.join(" ");
    debug!(command = %command, "running");
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| RunnerError::Spawn {
            command: command.clone(),
            source,
        })?;
    if !status.success() {
        warn!(command = %command, %status, "command failed");
        return Err(RunnerError::Failed { command, status });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: ExitStatus },
}
