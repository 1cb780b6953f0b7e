// src/dag/scheduler.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, trace};

use crate::config::model::JobFile;
use crate::dag::node::{ExecutionNode, NodeId};
use crate::dag::summary::RunSummary;
use crate::errors::{JobdagError, Result};
use crate::exec::{Environment, ProcessState};

/// Scheduler owns the job graph and its per-run bookkeeping.
///
/// It is responsible for:
/// - owning every registered node (an append-only arena addressed by
///   [`NodeId`])
/// - classifying new nodes as ready (no dependencies) or waiting
/// - promoting waiting nodes to the ready queue once their last unfinished
///   dependency finishes
/// - holding the environment snapshot every job is started with
///
/// The run loop itself lives in [`crate::engine`]; see [`Scheduler::run`].
///
/// Every node is in exactly one place at any time: the ready queue, the
/// waiting set, in flight (tracked by the run loop), or done.
#[derive(Debug)]
pub struct Scheduler {
    nodes: Vec<ExecutionNode>,
    /// Reverse edges: `dependents[n]` lists the nodes that depend on `n`,
    /// in registration order.
    dependents: Vec<Vec<NodeId>>,
    /// Number of dependencies of each node that have not finished yet.
    unfinished_deps: Vec<usize>,
    ready: VecDeque<NodeId>,
    waiting: BTreeSet<NodeId>,
    env: Environment,
    has_run: bool,
}

impl Scheduler {
    /// Empty scheduler whose jobs will run with exactly `env`.
    pub fn new(env: Environment) -> Self {
        Self {
            nodes: Vec::new(),
            dependents: Vec::new(),
            unfinished_deps: Vec::new(),
            ready: VecDeque::new(),
            waiting: BTreeSet::new(),
            env,
            has_run: false,
        }
    }

    /// Empty scheduler using a snapshot of the current process environment.
    pub fn with_captured_env() -> Self {
        Self::new(Environment::capture())
    }

    /// Build a scheduler from a validated [`JobFile`].
    ///
    /// Jobs are registered in dependency order, alphabetically among the
    /// jobs whose dependencies are already registered. Node names are the
    /// job names, so [`Scheduler::find`] maps them back to ids.
    pub fn from_config(cfg: &JobFile, env: Environment) -> Result<Self> {
        let mut scheduler = Self::new(env);

        for name in cfg.registration_order() {
            let job = &cfg.job[name];
            let deps = job
                .after
                .iter()
                .map(|dep| {
                    scheduler.find(dep).ok_or_else(|| {
                        JobdagError::ConfigError(format!(
                            "job '{name}' depends on '{dep}', which was not registered before it"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            scheduler.add_named_node(name, job.cmd.to_argv(), &deps)?;
        }

        Ok(scheduler)
    }

    /// Register a node named after its position (`node-<index>`).
    ///
    /// See [`Scheduler::add_named_node`].
    pub fn add_node<I, S>(&mut self, argv: I, dependencies: &[NodeId]) -> Result<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = format!("node-{}", self.nodes.len());
        self.add_named_node(name, argv, dependencies)
    }

    /// Register a node running `argv` once every node in `dependencies` has
    /// finished.
    ///
    /// - `argv` must contain at least the executable.
    /// - `dependencies` must be ids previously returned by this scheduler,
    ///   so the graph can never contain a cycle. Duplicates are ignored.
    /// - Nodes cannot be added once [`Scheduler::run`] has been called.
    ///
    /// A node without dependencies goes straight to the ready queue;
    /// anything else waits.
    pub fn add_named_node<I, S>(
        &mut self,
        name: impl Into<String>,
        argv: I,
        dependencies: &[NodeId],
    ) -> Result<NodeId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.has_run {
            return Err(JobdagError::GraphSealed);
        }

        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        if argv.is_empty() {
            return Err(JobdagError::EmptyCommand);
        }

        let mut deps: Vec<NodeId> = Vec::with_capacity(dependencies.len());
        for &dep in dependencies {
            if dep.index() >= self.nodes.len() {
                return Err(JobdagError::UnknownNode(dep));
            }
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        let id = NodeId::new(self.nodes.len());
        for &dep in &deps {
            self.dependents[dep.index()].push(id);
        }

        let unfinished = deps
            .iter()
            .filter(|dep| self.nodes[dep.index()].state() != ProcessState::Finished)
            .count();

        let name = name.into();
        debug!(node = %id, name = %name, deps = deps.len(), "registered node");

        self.nodes.push(ExecutionNode::new(name, argv, deps));
        self.dependents.push(Vec::new());
        self.unfinished_deps.push(unfinished);

        if unfinished == 0 {
            self.ready.push_back(id);
        } else {
            self.waiting.insert(id);
        }

        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&ExecutionNode> {
        self.nodes.get(id.index())
    }

    pub fn state_of(&self, id: NodeId) -> Option<ProcessState> {
        self.node(id).map(ExecutionNode::state)
    }

    /// First node registered under `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name() == name)
            .map(NodeId::new)
    }

    /// All nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ExecutionNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Whether every dependency of `id` has finished.
    pub fn is_ready(&self, id: NodeId) -> Option<bool> {
        let node = self.node(id)?;
        Some(
            node.dependencies()
                .iter()
                .all(|dep| self.nodes[dep.index()].state() == ProcessState::Finished),
        )
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for node in &self.nodes {
            if node.is_abandoned() {
                summary.abandoned.push(node.name().to_string());
            }
            match node.state() {
                ProcessState::NotStarted => summary.not_started += 1,
                ProcessState::Running => summary.running += 1,
                ProcessState::Finished => summary.finished += 1,
                ProcessState::Error => summary.failed.push(node.name().to_string()),
            }
        }
        summary
    }

    /// Seal the graph for a run. A scheduler runs at most once.
    pub(crate) fn begin_run(&mut self) -> Result<()> {
        if self.has_run {
            return Err(JobdagError::AlreadyRan);
        }
        self.has_run = true;
        Ok(())
    }

    pub(crate) fn pop_ready(&mut self) -> Option<NodeId> {
        self.ready.pop_front()
    }

    pub(crate) fn mark_running(&mut self, id: NodeId) {
        self.nodes[id.index()].set_running();
    }

    /// Mark `id` finished and promote every waiting dependent whose last
    /// unfinished dependency this was. Returns the promoted nodes, in the
    /// order they were appended to the ready queue.
    pub(crate) fn mark_finished(&mut self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.index()].set_finished();

        let mut promoted = Vec::new();
        for &dependent in &self.dependents[id.index()] {
            let remaining = &mut self.unfinished_deps[dependent.index()];
            *remaining = remaining.saturating_sub(1);

            if *remaining == 0 && self.waiting.remove(&dependent) {
                trace!(node = %dependent, "all dependencies finished; promoting");
                self.ready.push_back(dependent);
                promoted.push(dependent);
            }
        }
        promoted
    }

    /// Record that the run gave up on `id` while it was running.
    pub(crate) fn mark_abandoned(&mut self, id: NodeId) {
        self.nodes[id.index()].set_abandoned();
    }

    /// Mark `id` failed. `code` is `None` when the process never started.
    pub(crate) fn mark_failed(&mut self, id: NodeId, code: Option<i32>) {
        self.nodes[id.index()].set_failed(code);
    }
}
