// src/exec/launcher.rs

//! Pluggable process launcher abstraction.
//!
//! The run loop never touches OS processes directly. It talks to a
//! `ProcessLauncher`, which owns every live child and exposes three
//! operations: start a command, wait for any started command to exit, and
//! signal one of them. Processes the caller gives up on can be detached.
//!
//! - [`OsLauncher`](super::OsLauncher) is the production implementation.
//! - Tests can provide their own launcher that, for example, records launch
//!   order and scripts exit codes without spawning anything.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::exec::environment::Environment;
use crate::exec::process::Signal;

/// Opaque identifier of a launched process.
///
/// Handles are allocated by the launcher and never reused, unlike OS process
/// ids which may be recycled once a child has been reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessHandle(u64);

impl ProcessHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A launched process that has terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    pub handle: ProcessHandle,
    /// Exit code, or [`FAILED_EXIT_CODE`](super::FAILED_EXIT_CODE) for
    /// abnormal termination.
    pub code: i32,
}

impl Exit {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Trait abstracting how commands are started, awaited and signalled.
pub trait ProcessLauncher: Send {
    /// Start `argv` with exactly the variables in `env`.
    ///
    /// Must return quickly; it never waits for the command to finish.
    fn spawn(&mut self, argv: &[String], env: &Environment) -> Result<ProcessHandle>;

    /// Wait until any launched process terminates.
    ///
    /// This is the only operation allowed to block indefinitely. It may
    /// report handles the caller no longer tracks; callers must ignore those.
    fn wait_any(&mut self) -> Pin<Box<dyn Future<Output = Result<Exit>> + Send + '_>>;

    /// Deliver `signal` to a launched process that has not exited yet.
    fn signal(&mut self, handle: ProcessHandle, signal: Signal) -> Result<()>;

    /// Stop tracking `handle`. The process keeps running and is still
    /// reaped, but `wait_any` never reports it.
    fn detach(&mut self, handle: ProcessHandle);
}
