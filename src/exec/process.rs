// src/exec/process.rs

//! A single external command running as an OS child process.
//!
//! Lifecycle: created (configured, not running) -> spawned (`Running`) ->
//! reaped (`Finished` or `Error`). The exit code is cached at reap time, so
//! `join` and `state` keep answering after the OS has released the process.
//!
//! Dropping a `Process` whose child is still running blocks until the child
//! exits, so a `Process` never leaves an unowned child behind.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::errors::{JobdagError, Result};
use crate::exec::environment::Environment;

/// Exit code reported for a process that did not exit normally
/// (killed by a signal, failed reap, or never spawned).
pub const FAILED_EXIT_CODE: i32 = -1;

const DROP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle state of a process, also used for graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    NotStarted,
    Running,
    /// Reaped with exit code 0.
    Finished,
    /// Reaped with a non-zero exit code, killed, or could not be reaped.
    Error,
}

impl ProcessState {
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            ProcessState::Finished
        } else {
            ProcessState::Error
        }
    }

}

/// Signals that can be delivered to a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `SIGINT`
    Interrupt,
    /// `SIGTERM`
    Terminate,
    /// `SIGKILL`
    Kill,
}

#[derive(Debug)]
pub struct Process {
    argv: Vec<String>,
    executable: PathBuf,
    env: Environment,
    child: Option<Child>,
    pid: Option<u32>,
    exit_code: Option<i32>,
}

impl Process {
    /// Configure a process for `argv`; element 0 is the executable.
    ///
    /// The executable is resolved against the environment's `PATH` here, so
    /// `spawn` does no lookup work.
    pub fn new(argv: Vec<String>, env: Environment) -> Result<Self> {
        let program = argv.first().ok_or(JobdagError::EmptyCommand)?;
        let executable = env.resolve_executable(program);

        Ok(Self {
            argv,
            executable,
            env,
            child: None,
            pid: None,
            exit_code: None,
        })
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// OS process id, only while spawned and not yet reaped.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Start the child. Its environment is exactly the snapshot given to
    /// [`Process::new`]; stdout and stderr are inherited, stdin is closed.
    pub fn spawn(&mut self) -> Result<()> {
        if self.child.is_some() || self.exit_code.is_some() {
            return Err(JobdagError::AlreadySpawned);
        }

        let mut cmd = Command::new(&self.executable);
        #[cfg(unix)]
        cmd.arg0(&self.argv[0]);
        cmd.args(&self.argv[1..])
            .env_clear()
            .envs(self.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|source| JobdagError::Spawn {
            program: self.argv[0].clone(),
            source,
        })?;

        self.pid = child.id();
        self.child = Some(child);

        debug!(
            pid = self.pid,
            executable = %self.executable.display(),
            "process spawned"
        );
        Ok(())
    }

    /// Wait for this process to exit and return its exit code, or
    /// [`FAILED_EXIT_CODE`] if it did not exit normally.
    ///
    /// Once reaped, further calls return the cached code immediately.
    pub async fn join(&mut self) -> i32 {
        if let Some(code) = self.exit_code {
            return code;
        }

        let Some(child) = self.child.as_mut() else {
            return FAILED_EXIT_CODE;
        };

        let code = match child.wait().await {
            Ok(status) => exit_code_of(status),
            Err(err) => {
                warn!(pid = self.pid, error = %err, "failed to reap process");
                FAILED_EXIT_CODE
            }
        };

        self.reaped(code)
    }

    /// `spawn` followed by `join`.
    pub async fn run(&mut self) -> Result<i32> {
        self.spawn()?;
        Ok(self.join().await)
    }

    /// Deliver `signal` to the process. No-op before spawn or after reap.
    pub fn kill(&self, signal: Signal) -> Result<()> {
        match self.pid {
            Some(pid) => send_signal(pid, signal),
            None => Ok(()),
        }
    }

    /// Non-blocking state query. Reaps the process if it has exited.
    pub fn state(&mut self) -> ProcessState {
        if let Some(code) = self.exit_code {
            return ProcessState::from_exit_code(code);
        }

        let Some(child) = self.child.as_mut() else {
            return ProcessState::NotStarted;
        };

        match child.try_wait() {
            Ok(None) => ProcessState::Running,
            Ok(Some(status)) => {
                let code = self.reaped(exit_code_of(status));
                ProcessState::from_exit_code(code)
            }
            Err(err) => {
                warn!(pid = self.pid, error = %err, "failed to poll process state");
                self.reaped(FAILED_EXIT_CODE);
                ProcessState::Error
            }
        }
    }

    fn reaped(&mut self, code: i32) -> i32 {
        debug!(pid = self.pid, exit_code = code, "process reaped");
        self.exit_code = Some(code);
        self.child = None;
        self.pid = None;
        code
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        let mut announced = false;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid = self.pid, exit_code = exit_code_of(status), "process reaped on drop");
                    return;
                }
                Ok(None) => {
                    if !announced {
                        debug!(pid = self.pid, "process dropped while running; waiting for it to exit");
                        announced = true;
                    }
                    std::thread::sleep(DROP_POLL_INTERVAL);
                }
                Err(err) => {
                    warn!(pid = self.pid, error = %err, "failed to reap dropped process");
                    return;
                }
            }
        }
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                debug!(signal = status.signal(), "process terminated by signal");
            }
            FAILED_EXIT_CODE
        }
    }
}

#[cfg(unix)]
pub(crate) fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal as UnixSignal, kill};
    use nix::unistd::Pid;

    let sig = match signal {
        Signal::Interrupt => UnixSignal::SIGINT,
        Signal::Terminate => UnixSignal::SIGTERM,
        Signal::Kill => UnixSignal::SIGKILL,
    };
    let raw = i32::try_from(pid)
        .map_err(|_| JobdagError::Signal(format!("pid {pid} out of range")))?;

    match kill(Pid::from_raw(raw), sig) {
        Ok(()) => Ok(()),
        // Exited between our last poll and now.
        Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(JobdagError::Signal(format!("{sig:?} to pid {pid}: {err}"))),
    }
}

#[cfg(not(unix))]
pub(crate) fn send_signal(pid: u32, signal: Signal) -> Result<()> {
    Err(JobdagError::Signal(format!(
        "{signal:?} to pid {pid}: signals are only supported on unix"
    )))
}
