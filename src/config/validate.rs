// src/config/validate.rs

//! Semantic checks run when turning a [`RawJobFile`] into a [`JobFile`].

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{JobFile, RawJobFile};
use crate::errors::{JobdagError, Result};

impl TryFrom<RawJobFile> for JobFile {
    type Error = JobdagError;

    fn try_from(raw: RawJobFile) -> std::result::Result<Self, Self::Error> {
        check_job_file(&raw)?;
        Ok(JobFile::new_unchecked(raw.config, raw.job))
    }
}

fn check_job_file(raw: &RawJobFile) -> Result<()> {
    check_not_empty(raw)?;
    check_run_settings(raw)?;
    check_commands(raw)?;
    check_after_references(raw)?;
    check_acyclic(raw)
}

fn check_not_empty(raw: &RawJobFile) -> Result<()> {
    if raw.job.is_empty() {
        return Err(JobdagError::ConfigError(
            "job file must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn check_run_settings(raw: &RawJobFile) -> Result<()> {
    // `on_failure` is rejected by serde if unknown.
    if raw.config.jobs == 0 {
        return Err(JobdagError::ConfigError(
            "[config].jobs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn check_commands(raw: &RawJobFile) -> Result<()> {
    match raw.job.iter().find(|(_, job)| job.cmd.is_empty()) {
        Some((name, _)) => Err(JobdagError::ConfigError(format!(
            "job '{name}' has an empty `cmd`"
        ))),
        None => Ok(()),
    }
}

fn check_after_references(raw: &RawJobFile) -> Result<()> {
    for (name, job) in &raw.job {
        for dep in &job.after {
            if dep == name {
                return Err(JobdagError::ConfigError(format!(
                    "job '{name}' cannot depend on itself in `after`"
                )));
            }
            if !raw.job.contains_key(dep) {
                return Err(JobdagError::ConfigError(format!(
                    "job '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
        }
    }
    Ok(())
}

/// Edges point from a dependency to the job waiting on it.
fn check_acyclic(raw: &RawJobFile) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (name, job) in &raw.job {
        graph.add_node(name.as_str());
        for dep in &job.after {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    if toposort(&graph, None).is_ok() {
        return Ok(());
    }

    let mut members: Vec<&str> = tarjan_scc(&graph)
        .into_iter()
        .find(|component| component.len() > 1)
        .unwrap_or_default();
    members.sort_unstable();

    Err(JobdagError::DagCycle(format!(
        "jobs [{}] depend on each other in a cycle",
        members.join(", ")
    )))
}
