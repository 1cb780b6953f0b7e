use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::pin::Pin;

use jobdag::errors::{JobdagError, Result};
use jobdag::exec::{Environment, Exit, FAILED_EXIT_CODE, ProcessHandle, ProcessLauncher, Signal};

/// Something that happened to a fake process, keyed by program name
/// (`argv[0]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchEvent {
    Started(String),
    Exited(String, i32),
    Signalled(String, Signal),
    Detached(String),
}

/// Which in-flight process `wait_any` reports next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishOrder {
    /// The earliest launched process exits first.
    Oldest,
    /// The most recently launched process exits first.
    Newest,
}

/// A launcher that never spawns anything:
/// - records every start, exit, signal and detach in order
/// - exits processes with scripted codes (0 unless configured)
/// - tracks the largest number of processes in flight at once.
///
/// A process that was signalled exits with `FAILED_EXIT_CODE`, like a real
/// process killed by a signal.
pub struct FakeLauncher {
    next_handle: u64,
    exit_codes: HashMap<String, i32>,
    spawn_failures: HashSet<String>,
    order: FinishOrder,
    untracked_exits: usize,
    in_flight: Vec<(ProcessHandle, String)>,
    signalled: HashSet<ProcessHandle>,
    events: Vec<LaunchEvent>,
    peak_in_flight: usize,
    environments: Vec<Environment>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            exit_codes: HashMap::new(),
            spawn_failures: HashSet::new(),
            order: FinishOrder::Oldest,
            untracked_exits: 0,
            in_flight: Vec::new(),
            signalled: HashSet::new(),
            events: Vec::new(),
            peak_in_flight: 0,
            environments: Vec::new(),
        }
    }

    /// Make `program` exit with `code`.
    pub fn exit_code(mut self, program: &str, code: i32) -> Self {
        self.exit_codes.insert(program.to_string(), code);
        self
    }

    /// Make spawning `program` fail as if the executable did not exist.
    pub fn fail_to_spawn(mut self, program: &str) -> Self {
        self.spawn_failures.insert(program.to_string());
        self
    }

    pub fn finish_order(mut self, order: FinishOrder) -> Self {
        self.order = order;
        self
    }

    /// Report `n` exits for handles this launcher never returned before
    /// reporting any real exit.
    pub fn untracked_exits(mut self, n: usize) -> Self {
        self.untracked_exits = n;
        self
    }

    pub fn events(&self) -> &[LaunchEvent] {
        &self.events
    }

    /// Program names in launch order.
    pub fn started(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LaunchEvent::Started(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Program names in exit order.
    pub fn exited(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LaunchEvent::Exited(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn signals(&self) -> Vec<(String, Signal)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LaunchEvent::Signalled(name, sig) => Some((name.clone(), *sig)),
                _ => None,
            })
            .collect()
    }

    /// Program names handed to `detach`, in order.
    pub fn detached(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LaunchEvent::Detached(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    /// Processes launched but not yet reported by `wait_any`.
    pub fn still_running(&self) -> Vec<String> {
        self.in_flight.iter().map(|(_, name)| name.clone()).collect()
    }

    /// Environment passed to each spawn, in launch order.
    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn next_exit(&mut self) -> Result<Exit> {
        if self.untracked_exits > 0 {
            self.untracked_exits -= 1;
            return Ok(Exit {
                handle: ProcessHandle::from_raw(u64::MAX - self.untracked_exits as u64),
                code: 0,
            });
        }

        if self.in_flight.is_empty() {
            return Err(JobdagError::NothingInFlight);
        }

        let idx = match self.order {
            FinishOrder::Oldest => 0,
            FinishOrder::Newest => self.in_flight.len() - 1,
        };
        let (handle, name) = self.in_flight.remove(idx);

        let code = if self.signalled.contains(&handle) {
            FAILED_EXIT_CODE
        } else {
            self.exit_codes.get(&name).copied().unwrap_or(0)
        };

        self.events.push(LaunchEvent::Exited(name, code));
        Ok(Exit { handle, code })
    }
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn spawn(&mut self, argv: &[String], env: &Environment) -> Result<ProcessHandle> {
        let program = argv.first().cloned().ok_or(JobdagError::EmptyCommand)?;

        if self.spawn_failures.contains(&program) {
            return Err(JobdagError::Spawn {
                program,
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            });
        }

        self.next_handle += 1;
        let handle = ProcessHandle::from_raw(self.next_handle);

        self.environments.push(env.clone());
        self.events.push(LaunchEvent::Started(program.clone()));
        self.in_flight.push((handle, program));
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight.len());

        Ok(handle)
    }

    fn wait_any(&mut self) -> Pin<Box<dyn Future<Output = Result<Exit>> + Send + '_>> {
        let exit = self.next_exit();
        Box::pin(async move { exit })
    }

    fn signal(&mut self, handle: ProcessHandle, signal: Signal) -> Result<()> {
        if let Some((_, name)) = self.in_flight.iter().find(|(h, _)| *h == handle) {
            self.events.push(LaunchEvent::Signalled(name.clone(), signal));
            self.signalled.insert(handle);
        }
        Ok(())
    }

    fn detach(&mut self, handle: ProcessHandle) {
        if let Some(idx) = self.in_flight.iter().position(|(h, _)| *h == handle) {
            let (_, name) = self.in_flight.remove(idx);
            self.events.push(LaunchEvent::Detached(name));
        }
    }
}
