// src/engine/monitor.rs

//! In-flight bookkeeping for the run loop.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::dag::NodeId;
use crate::exec::ProcessHandle;

/// A node whose process is currently running.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionMonitor {
    pub node: NodeId,
    pub handle: ProcessHandle,
    started: Instant,
}

impl ExecutionMonitor {
    pub fn new(node: NodeId, handle: ProcessHandle) -> Self {
        Self {
            node,
            handle,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Monitors keyed by process handle. The run loop keeps its size at or
/// below the concurrency limit.
#[derive(Debug, Default)]
pub struct InFlight {
    monitors: BTreeMap<ProcessHandle, ExecutionMonitor>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, monitor: ExecutionMonitor) {
        self.monitors.insert(monitor.handle, monitor);
    }

    pub fn remove(&mut self, handle: ProcessHandle) -> Option<ExecutionMonitor> {
        self.monitors.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn handles(&self) -> Vec<ProcessHandle> {
        self.monitors.keys().copied().collect()
    }

    /// Remove and return every monitor, in handle order.
    pub fn drain(&mut self) -> Vec<ExecutionMonitor> {
        std::mem::take(&mut self.monitors).into_values().collect()
    }
}
