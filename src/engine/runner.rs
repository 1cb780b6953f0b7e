// src/engine/runner.rs

//! The run loop: launch ready nodes up to the concurrency limit, wait for any
//! of them to exit, update the graph, repeat.

use tracing::{debug, error, info, warn};

use crate::dag::{NodeId, Scheduler};
use crate::engine::RunOptions;
use crate::engine::monitor::{ExecutionMonitor, InFlight};
use crate::errors::{JobdagError, Result};
use crate::exec::{Exit, ProcessHandle, ProcessLauncher, Signal};
use crate::types::FailurePolicy;

impl Scheduler {
    /// Run every registered node through `launcher`, at most
    /// `options.jobs` at a time (a limit of 0 is treated as 1).
    ///
    /// Returns `Ok(true)` when every node finished with exit code 0 and
    /// `Ok(false)` as soon as one node fails, after applying
    /// `options.failure_policy` to the nodes still in flight. A node whose
    /// command cannot be spawned counts as failed. Per-node outcomes stay
    /// available through [`Scheduler::node`] and [`Scheduler::summary`].
    ///
    /// `Err` is reserved for misuse (running twice) and launcher breakage.
    /// A scheduler can only be run once.
    pub async fn run<L>(&mut self, launcher: &mut L, options: &RunOptions) -> Result<bool>
    where
        L: ProcessLauncher + ?Sized,
    {
        self.begin_run()?;

        let jobs = options.jobs.max(1);
        let mut in_flight = InFlight::new();

        info!(
            nodes = self.len(),
            jobs,
            on_failure = %options.failure_policy,
            "run started"
        );

        loop {
            while in_flight.len() < jobs {
                let Some(id) = self.pop_ready() else {
                    break;
                };

                match self.launch(id, launcher, options.verbose) {
                    Ok(handle) => in_flight.insert(ExecutionMonitor::new(id, handle)),
                    Err(err) => {
                        error!(node = %self.name_of(id), error = %err, "failed to launch job");
                        self.mark_failed(id, None);
                        return self.fail(launcher, &mut in_flight, options).await;
                    }
                }
            }

            // Launching stops only when the limit is hit or nothing is ready,
            // so an empty in-flight set means the ready queue is empty too.
            if in_flight.is_empty() {
                let waiting = self.waiting_len();
                if waiting > 0 {
                    error!(waiting, "nothing ready and nothing running; run stalled");
                    return Err(JobdagError::Stalled { waiting });
                }
                break;
            }

            let exit = launcher.wait_any().await?;
            let Some(monitor) = in_flight.remove(exit.handle) else {
                debug!(handle = %exit.handle, "ignoring exit of untracked process");
                continue;
            };

            if !self.record_exit(&monitor, exit) {
                return self.fail(launcher, &mut in_flight, options).await;
            }
        }

        info!(nodes = self.len(), "run finished; all jobs succeeded");
        Ok(true)
    }

    fn launch<L>(&mut self, id: NodeId, launcher: &mut L, verbose: bool) -> Result<ProcessHandle>
    where
        L: ProcessLauncher + ?Sized,
    {
        let handle = {
            let node = self.node(id).ok_or(JobdagError::UnknownNode(id))?;
            let cmd = node.argv().join(" ");
            if verbose {
                info!(node = %node.name(), cmd = %cmd, "launching job");
            } else {
                debug!(node = %node.name(), cmd = %cmd, "launching job");
            }
            launcher.spawn(node.argv(), self.environment())?
        };

        self.mark_running(id);
        Ok(handle)
    }

    /// Apply a tracked exit to the graph. Returns whether the job succeeded.
    fn record_exit(&mut self, monitor: &ExecutionMonitor, exit: Exit) -> bool {
        let elapsed = monitor.elapsed();

        if exit.success() {
            let promoted = self.mark_finished(monitor.node);
            info!(
                node = %self.name_of(monitor.node),
                ?elapsed,
                promoted = promoted.len(),
                "job finished"
            );
            true
        } else {
            self.mark_failed(monitor.node, Some(exit.code));
            warn!(
                node = %self.name_of(monitor.node),
                exit_code = exit.code,
                ?elapsed,
                "job failed"
            );
            false
        }
    }

    /// Stop the run after a failure, handling jobs still in flight
    /// according to the failure policy. Always reports failure.
    async fn fail<L>(
        &mut self,
        launcher: &mut L,
        in_flight: &mut InFlight,
        options: &RunOptions,
    ) -> Result<bool>
    where
        L: ProcessLauncher + ?Sized,
    {
        match options.failure_policy {
            FailurePolicy::Abandon => {
                let abandoned = in_flight.drain();
                if !abandoned.is_empty() {
                    warn!(abandoned = abandoned.len(), "abandoning jobs still running");
                }
                for monitor in abandoned {
                    launcher.detach(monitor.handle);
                    self.mark_abandoned(monitor.node);
                }
            }
            FailurePolicy::Terminate => {
                for handle in in_flight.handles() {
                    if let Err(err) = launcher.signal(handle, Signal::Terminate) {
                        warn!(%handle, error = %err, "failed to terminate job");
                    }
                }
                self.drain(launcher, in_flight).await?;
            }
            FailurePolicy::Drain => {
                self.drain(launcher, in_flight).await?;
            }
        }

        let summary = self.summary();
        warn!(
            failed = ?summary.failed,
            finished = summary.finished,
            not_started = summary.not_started,
            running = summary.running,
            abandoned = ?summary.abandoned,
            "run failed"
        );
        Ok(false)
    }

    /// Wait for every in-flight job, recording its outcome. Nothing new is
    /// launched.
    async fn drain<L>(&mut self, launcher: &mut L, in_flight: &mut InFlight) -> Result<()>
    where
        L: ProcessLauncher + ?Sized,
    {
        if !in_flight.is_empty() {
            info!(running = in_flight.len(), "waiting for running jobs before stopping");
        }

        while !in_flight.is_empty() {
            let exit = launcher.wait_any().await?;
            match in_flight.remove(exit.handle) {
                Some(monitor) => {
                    self.record_exit(&monitor, exit);
                }
                None => debug!(handle = %exit.handle, "ignoring exit of untracked process"),
            }
        }
        Ok(())
    }

    fn name_of(&self, id: NodeId) -> &str {
        self.node(id).map(|node| node.name()).unwrap_or("<unknown>")
    }
}
