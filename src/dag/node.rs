// src/dag/node.rs

//! Graph vertices and their handles.

use std::fmt;

use crate::exec::ProcessState;

/// Stable handle to a node in a [`Scheduler`](super::Scheduler)'s arena.
///
/// Only meaningful for the scheduler that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in registration order, starting at 0.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// One unit of work: a command line, the nodes it waits for, and where it
/// is in its lifecycle.
#[derive(Debug, Clone)]
pub struct ExecutionNode {
    name: String,
    argv: Vec<String>,
    dependencies: Vec<NodeId>,
    state: ProcessState,
    /// Exit code once the node's process has been reaped. `None` while not
    /// started or running, and for nodes whose process could not be spawned.
    exit_code: Option<i32>,
    abandoned: bool,
}

impl ExecutionNode {
    pub(crate) fn new(name: String, argv: Vec<String>, dependencies: Vec<NodeId>) -> Self {
        Self {
            name,
            argv,
            dependencies,
            state: ProcessState::NotStarted,
            exit_code: None,
            abandoned: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command line; element 0 is the executable.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// The run stopped watching this node while its process was running.
    /// Its state stays `Running` (the last state observed) even though the
    /// process carries on and eventually exits.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub(crate) fn set_running(&mut self) {
        self.state = ProcessState::Running;
    }

    pub(crate) fn set_finished(&mut self) {
        self.exit_code = Some(0);
        self.state = ProcessState::Finished;
    }

    pub(crate) fn set_abandoned(&mut self) {
        self.abandoned = true;
    }

    pub(crate) fn set_failed(&mut self, code: Option<i32>) {
        self.exit_code = code;
        self.state = ProcessState::Error;
    }
}
