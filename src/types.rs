use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What the run loop does with jobs still in flight once one job fails.
///
/// - `Drain`: launch nothing new, wait for every running job and record its
///   real outcome, then report failure (default behaviour).
/// - `Terminate`: send `SIGTERM` to every running job, then wait for them
///   like `Drain`. Only the job's own process is signalled; processes it
///   started itself (e.g. under `sh -c`) share its process group and are
///   left alone.
/// - `Abandon`: report failure immediately. Running jobs are detached from
///   the launcher and keep running; they are still reaped in the background.
///   Their nodes keep their last observed state, `Running`, and are flagged
///   with `ExecutionNode::is_abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Drain,
    Terminate,
    Abandon,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Drain
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drain" => Ok(FailurePolicy::Drain),
            "terminate" => Ok(FailurePolicy::Terminate),
            "abandon" => Ok(FailurePolicy::Abandon),
            other => Err(format!(
                "invalid on_failure: {other} (expected \"drain\", \"terminate\" or \"abandon\")"
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailurePolicy::Drain => "drain",
            FailurePolicy::Terminate => "terminate",
            FailurePolicy::Abandon => "abandon",
        };
        f.write_str(s)
    }
}
