// src/config/model.rs

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::types::FailurePolicy;

/// Job file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// jobs = 4
/// on_failure = "drain"
///
/// [job.compile_a]
/// cmd = ["cc", "-c", "a.c"]
///
/// [job.link]
/// cmd = "cc a.o b.o -o app"
/// after = ["compile_a", "compile_b"]
/// ```
///
/// All sections are optional and have reasonable defaults. Convert into a
/// [`JobFile`] with `JobFile::try_from`, which validates the graph.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJobFile {
    /// Run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// A validated job file: every dependency exists, nothing depends on
/// itself, and the graph has no cycle.
#[derive(Debug, Clone)]
pub struct JobFile {
    pub config: ConfigSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl JobFile {
    pub(crate) fn new_unchecked(config: ConfigSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { config, job }
    }

    /// Job names in the order they should be registered with a scheduler.
    ///
    /// Repeated passes over the names in alphabetical order, taking each job
    /// as soon as all of its `after` entries have been taken. Jobs that can
    /// never be taken (only possible for unvalidated input) are left out.
    pub fn registration_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = Vec::with_capacity(self.job.len());
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.job.len());

        loop {
            let before = order.len();

            for (name, job) in &self.job {
                if placed.contains(name.as_str()) {
                    continue;
                }
                if job.after.iter().all(|dep| placed.contains(dep.as_str())) {
                    placed.insert(name.as_str());
                    order.push(name.as_str());
                }
            }

            if order.len() == before {
                break;
            }
        }

        order
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of jobs running at once.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Log every launched command line.
    #[serde(default)]
    pub verbose: bool,

    /// `"drain"` (default), `"terminate"` or `"abandon"`.
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

fn default_jobs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            verbose: false,
            on_failure: FailurePolicy::default(),
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// The command to execute.
    pub cmd: CommandSpec,

    /// Dependency list: this job waits for every job listed here.
    #[serde(default)]
    pub after: Vec<String>,
}

/// A job's command, either as an explicit argument vector or as a shell
/// command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// `cmd = ["cc", "-c", "a.c"]`; element 0 is the executable.
    Argv(Vec<String>),
    /// `cmd = "cc a.o -o app"`; run through the platform shell.
    Shell(String),
}

impl CommandSpec {
    /// Argument vector to hand to the scheduler.
    pub fn to_argv(&self) -> Vec<String> {
        match self {
            CommandSpec::Argv(argv) => argv.clone(),
            CommandSpec::Shell(line) if cfg!(windows) => {
                vec!["cmd".to_string(), "/C".to_string(), line.clone()]
            }
            CommandSpec::Shell(line) => vec!["sh".to_string(), "-c".to_string(), line.clone()],
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandSpec::Argv(argv) => argv.first().is_none_or(|exe| exe.trim().is_empty()),
            CommandSpec::Shell(line) => line.trim().is_empty(),
        }
    }
}
