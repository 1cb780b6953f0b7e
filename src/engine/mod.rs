// src/engine/mod.rs

//! Run loop for a job graph.
//!
//! The graph itself ([`crate::dag::Scheduler`]) is pure bookkeeping. This
//! module drives it against a [`crate::exec::ProcessLauncher`]:
//!
//! - [`monitor`] tracks which node each in-flight process belongs to.
//! - [`runner`] implements `Scheduler::run`, including what happens to
//!   running jobs when one of them fails.
//!
//! The run loop has a single suspension point, `ProcessLauncher::wait_any`.
//! All parallelism comes from the child processes themselves.

use crate::config::model::ConfigSection;
use crate::types::FailurePolicy;

pub mod monitor;
pub mod runner;

pub use monitor::{ExecutionMonitor, InFlight};

/// Options for a single call to `Scheduler::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of jobs running at once. 0 is treated as 1.
    pub jobs: usize,
    /// Log every launched command line at `info` instead of `debug`.
    pub verbose: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            verbose: false,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl RunOptions {
    /// Options as written in the `[config]` section of a job file.
    pub fn from_config(section: &ConfigSection) -> Self {
        Self {
            jobs: section.jobs,
            verbose: section.verbose,
            failure_policy: section.on_failure,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
