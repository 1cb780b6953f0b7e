// src/dag/mod.rs

//! Job graph representation and bookkeeping.
//!
//! - [`node`] defines graph vertices and their stable ids.
//! - [`scheduler`] owns the node arena, the ready queue and the waiting set,
//!   and promotes waiting nodes as their dependencies finish.
//! - [`summary`] tallies node states after a run.

pub mod node;
pub mod scheduler;
pub mod summary;

pub use node::{ExecutionNode, NodeId};
pub use scheduler::Scheduler;
pub use summary::RunSummary;
