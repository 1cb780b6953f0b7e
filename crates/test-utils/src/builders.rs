#![allow(dead_code)]

use std::collections::BTreeMap;

use jobdag::FailurePolicy;
use jobdag::config::{CommandSpec, ConfigSection, JobConfig, JobFile, RawJobFile};

/// Builder for `JobFile` to simplify test setup.
pub struct JobFileBuilder {
    raw: RawJobFile,
}

impl JobFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawJobFile {
                config: ConfigSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.raw.job.insert(name.to_string(), job);
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.raw.config.jobs = jobs;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.raw.config.verbose = verbose;
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.raw.config.on_failure = policy;
        self
    }

    /// The unvalidated job file, for exercising validation errors.
    pub fn build_raw(self) -> RawJobFile {
        self.raw
    }

    pub fn build(self) -> JobFile {
        JobFile::try_from(self.raw).expect("Failed to build valid job file from builder")
    }
}

impl Default for JobFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    /// Job running an explicit argument vector.
    pub fn argv(argv: &[&str]) -> Self {
        Self {
            job: JobConfig {
                cmd: CommandSpec::Argv(argv.iter().map(|s| s.to_string()).collect()),
                after: vec![],
            },
        }
    }

    /// Job running a shell command line.
    pub fn shell(line: &str) -> Self {
        Self {
            job: JobConfig {
                cmd: CommandSpec::Shell(line.to_string()),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
