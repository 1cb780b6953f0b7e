// src/dag/summary.rs

//! Per-state tally of a scheduler's nodes.

/// Snapshot of where every node ended up.
///
/// Useful after [`Scheduler::run`](super::Scheduler::run) returns `false` to
/// see which jobs failed and which never started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub not_started: usize,
    pub running: usize,
    pub finished: usize,
    /// Names of nodes in state `Error`, in registration order.
    pub failed: Vec<String>,
    /// Names of nodes left running when the run was abandoned. They are
    /// also counted in `running`.
    pub abandoned: Vec<String>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.not_started + self.running + self.finished + self.failed.len()
    }

    /// Whether every node reached `Finished`.
    pub fn all_finished(&self) -> bool {
        self.finished == self.total()
    }
}
