// src/exec/mod.rs

//! Process execution layer.
//!
//! This module owns everything that touches the operating system's process
//! table:
//!
//! - [`environment`] holds the environment snapshot and `PATH` lookup.
//! - [`process`] wraps a single child process (spawn, join, state, signal).
//! - [`launcher`] defines the `ProcessLauncher` trait the run loop uses,
//!   which tests can replace with a fake implementation.
//! - [`os_launcher`] provides `OsLauncher`, the production launcher built on
//!   `tokio::process`.

pub mod environment;
pub mod launcher;
pub mod os_launcher;
pub mod process;

pub use environment::Environment;
pub use launcher::{Exit, ProcessHandle, ProcessLauncher};
pub use os_launcher::OsLauncher;
pub use process::{FAILED_EXIT_CODE, Process, ProcessState, Signal};
