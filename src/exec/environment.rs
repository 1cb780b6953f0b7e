// src/exec/environment.rs

//! Environment snapshot handed to every spawned job.
//!
//! The scheduler captures the environment once and passes the same snapshot
//! to all children, so a run never observes later changes to the parent's
//! environment. `PATH` lookup for bare executable names also goes through the
//! snapshot.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Ordered list of environment variables passed to child processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: Vec<(OsString, OsString)>,
}

impl Environment {
    /// Empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut env = Self::new();
        for (k, v) in vars {
            env.set(k, v);
        }
        env
    }

    /// Builder: add or replace a variable.
    pub fn with_var(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.set(key, value);
        self
    }

    /// Add a variable, replacing any existing value for the same key.
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        let key = key.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((key, value)),
        }
    }

    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        let key = key.as_ref();
        self.vars
            .iter()
            .find(|(k, _)| k.as_os_str() == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Resolve the executable for `program`.
    ///
    /// A name containing a path separator is used verbatim. A bare name is
    /// looked up in the snapshot's `PATH`, first match wins. Without a match
    /// the bare name is returned unchanged and spawning it will fail.
    pub fn resolve_executable(&self, program: &str) -> PathBuf {
        if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
            return PathBuf::from(program);
        }

        if let Some(path_var) = self.get("PATH") {
            for dir in std::env::split_paths(path_var) {
                let candidate = dir.join(program);
                if is_file(&candidate) {
                    return candidate;
                }
            }
        }

        PathBuf::from(program)
    }
}

fn is_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
