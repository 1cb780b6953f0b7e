// src/exec/os_launcher.rs

//! Production launcher backed by `tokio::process`.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{JobdagError, Result};
use crate::exec::environment::Environment;
use crate::exec::launcher::{Exit, ProcessHandle, ProcessLauncher};
use crate::exec::process::{Process, Signal};

/// Control side of a process whose exit has not been collected yet.
struct LiveProcess {
    signals: mpsc::UnboundedSender<Signal>,
    pid: Option<u32>,
    /// Nobody will collect this exit; the supervising task drops the entry
    /// itself when the process ends.
    detached: bool,
    /// The process ended and its `Exit` is queued.
    exited: bool,
}

type LiveMap = Arc<Mutex<HashMap<ProcessHandle, LiveProcess>>>;

fn lock(live: &LiveMap) -> MutexGuard<'_, HashMap<ProcessHandle, LiveProcess>> {
    live.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Launches real OS processes.
///
/// Every child is owned by its own Tokio task, which waits for it to exit,
/// delivers any signals requested through [`ProcessLauncher::signal`], and
/// finally reports an [`Exit`] that [`ProcessLauncher::wait_any`] picks up.
/// Because the task that signals a child is the same one that reaps it, a
/// recycled pid can never be signalled by mistake.
///
/// A [`detached`](ProcessLauncher::detach) process is still awaited by its
/// task, but its exit is discarded and its entry removed as soon as it
/// ends, so abandoned jobs leave nothing behind in the launcher.
///
/// `spawn` must be called from within a Tokio runtime.
pub struct OsLauncher {
    next_handle: u64,
    live: LiveMap,
    /// Exits received while discarding stale ones, not yet returned.
    pending: VecDeque<Exit>,
    exit_tx: mpsc::UnboundedSender<Exit>,
    exit_rx: mpsc::UnboundedReceiver<Exit>,
}

impl OsLauncher {
    pub fn new() -> Self {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Self {
            next_handle: 0,
            live: Arc::new(Mutex::new(HashMap::new())),
            pending: VecDeque::new(),
            exit_tx,
            exit_rx,
        }
    }

    /// Number of launched processes whose exit has not been collected or
    /// discarded yet, detached ones included.
    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }

    /// Move queued exits into `pending`, dropping those nobody tracks.
    fn discard_stale_exits(&mut self) {
        while let Ok(exit) = self.exit_rx.try_recv() {
            if lock(&self.live).contains_key(&exit.handle) {
                self.pending.push_back(exit);
            } else {
                debug!(handle = %exit.handle, "discarding exit of detached process");
            }
        }
    }
}

impl Default for OsLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for OsLauncher {
    fn spawn(&mut self, argv: &[String], env: &Environment) -> Result<ProcessHandle> {
        let mut process = Process::new(argv.to_vec(), env.clone())?;
        process.spawn()?;

        self.next_handle += 1;
        let handle = ProcessHandle::from_raw(self.next_handle);
        let pid = process.pid();

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        lock(&self.live).insert(
            handle,
            LiveProcess {
                signals: signal_tx,
                pid,
                detached: false,
                exited: false,
            },
        );

        let live = Arc::clone(&self.live);
        let exit_tx = self.exit_tx.clone();
        tokio::spawn(async move {
            supervise(handle, process, signal_rx, live, exit_tx).await;
        });

        debug!(%handle, pid, "launched process");
        Ok(handle)
    }

    fn wait_any(&mut self) -> Pin<Box<dyn Future<Output = Result<Exit>> + Send + '_>> {
        Box::pin(async move {
            loop {
                let tracked = lock(&self.live).values().filter(|p| !p.detached).count();
                if tracked == 0 {
                    return Err(JobdagError::NothingInFlight);
                }

                let exit = match self.pending.pop_front() {
                    Some(exit) => exit,
                    // We hold a sender ourselves, so the channel never closes.
                    None => self
                        .exit_rx
                        .recv()
                        .await
                        .ok_or(JobdagError::NothingInFlight)?,
                };

                match lock(&self.live).remove(&exit.handle) {
                    Some(entry) if !entry.detached => return Ok(exit),
                    _ => debug!(handle = %exit.handle, "discarding exit of detached process"),
                }
            }
        })
    }

    fn signal(&mut self, handle: ProcessHandle, signal: Signal) -> Result<()> {
        match lock(&self.live).get(&handle) {
            Some(live) if !live.exited => {
                debug!(%handle, pid = live.pid, ?signal, "forwarding signal");
                if live.signals.send(signal).is_err() {
                    debug!(%handle, "process already exited; signal dropped");
                }
            }
            _ => {
                debug!(%handle, ?signal, "signal for unknown or exited process ignored");
            }
        }
        Ok(())
    }

    fn detach(&mut self, handle: ProcessHandle) {
        {
            let mut entries = lock(&self.live);
            if let Some(entry) = entries.get_mut(&handle) {
                if entry.exited {
                    entries.remove(&handle);
                } else {
                    entry.detached = true;
                }
            }
        }
        debug!(%handle, "process detached");
        self.discard_stale_exits();
    }
}

/// Own `process` until it exits, applying signals as they arrive.
async fn supervise(
    handle: ProcessHandle,
    mut process: Process,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    live: LiveMap,
    exit_tx: mpsc::UnboundedSender<Exit>,
) {
    let code = loop {
        let signal = tokio::select! {
            code = process.join() => break code,
            Some(signal) = signals.recv() => signal,
        };

        info!(%handle, pid = process.pid(), ?signal, "signalling process");
        if let Err(err) = process.kill(signal) {
            warn!(%handle, error = %err, "failed to signal process");
        }
    };

    debug!(%handle, exit_code = code, "process exited");

    // Marking the entry and queueing the exit happen under one lock, so
    // `detach` either sees a running process or a queued exit.
    let mut entries = lock(&live);
    let Some(entry) = entries.get_mut(&handle) else {
        return;
    };
    if entry.detached {
        entries.remove(&handle);
        debug!(%handle, exit_code = code, "detached process exited");
    } else {
        entry.exited = true;
        if exit_tx.send(Exit { handle, code }).is_err() {
            debug!(%handle, "launcher dropped before exit was collected");
        }
    }
}
