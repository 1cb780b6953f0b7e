// tests/os_launcher_integration.rs

#![cfg(unix)]

mod common;
use crate::common::builders::{JobConfigBuilder, JobFileBuilder};
use crate::common::{argv, init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use jobdag::cli::CliArgs;
use jobdag::dag::Scheduler;
use jobdag::engine::RunOptions;
use jobdag::exec::{Environment, FAILED_EXIT_CODE, OsLauncher, ProcessLauncher, ProcessState};
use jobdag::{FailurePolicy, JobdagError};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

fn append(log: &Path, line: &str) -> Vec<String> {
    argv(&["sh", "-c", &format!("echo {line} >> '{}'", log.display())])
}

fn log_lines(log: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    Ok(fs::read_to_string(log)?
        .lines()
        .map(str::to_string)
        .collect())
}

#[tokio::test]
async fn chain_of_real_processes_runs_in_order() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log = dir.path().join("order.log");

    let mut s = Scheduler::with_captured_env();
    let a = s.add_named_node("A", append(&log, "A"), &[])?;
    let b = s.add_named_node("B", append(&log, "B"), &[a])?;
    s.add_named_node("C", append(&log, "C"), &[b])?;

    let mut launcher = OsLauncher::new();
    let ok = with_timeout(s.run(&mut launcher, &RunOptions::default().with_jobs(4))).await?;

    assert!(ok);
    assert_eq!(log_lines(&log)?, vec!["A", "B", "C"]);
    assert_eq!(launcher.live_count(), 0);
    Ok(())
}

#[tokio::test]
async fn fan_in_sees_outputs_of_all_dependencies() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let a_out = dir.path().join("a.out");
    let b_out = dir.path().join("b.out");
    let c_out = dir.path().join("c.out");

    let mut s = Scheduler::with_captured_env();
    let a = s.add_named_node(
        "A",
        argv(&["sh", "-c", &format!("sleep 0.2; touch '{}'", a_out.display())]),
        &[],
    )?;
    let b = s.add_named_node("B", argv(&["touch", b_out.to_str().ok_or("non-utf8 path")?]), &[])?;
    s.add_named_node(
        "C",
        argv(&[
            "sh",
            "-c",
            &format!(
                "test -f '{}' && test -f '{}' && touch '{}'",
                a_out.display(),
                b_out.display(),
                c_out.display()
            ),
        ]),
        &[a, b],
    )?;

    let mut launcher = OsLauncher::new();
    let ok = with_timeout(s.run(&mut launcher, &RunOptions::default().with_jobs(2))).await?;

    assert!(ok);
    assert!(c_out.exists());
    Ok(())
}

#[tokio::test]
async fn failing_process_skips_dependents() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let marker = dir.path().join("never");

    let mut s = Scheduler::with_captured_env();
    let a = s.add_named_node("A", argv(&["sh", "-c", "exit 4"]), &[])?;
    let b = s.add_named_node("B", argv(&["touch", marker.to_str().ok_or("non-utf8 path")?]), &[a])?;

    let mut launcher = OsLauncher::new();
    let ok = with_timeout(s.run(&mut launcher, &RunOptions::default())).await?;

    assert!(!ok);
    assert_eq!(s.node(a).and_then(|n| n.exit_code()), Some(4));
    assert_eq!(s.state_of(b), Some(ProcessState::NotStarted));
    assert!(!marker.exists());
    Ok(())
}

#[tokio::test]
async fn terminate_policy_stops_long_running_jobs() -> TestResult {
    init_tracing();
    let mut s = Scheduler::with_captured_env();
    let sleeper = s.add_named_node("sleeper", ["sleep", "30"], &[])?;
    let failing = s.add_named_node("failing", ["sh", "-c", "sleep 0.1; exit 2"], &[])?;

    let mut launcher = OsLauncher::new();
    let options = RunOptions::default()
        .with_jobs(2)
        .with_failure_policy(FailurePolicy::Terminate);
    let ok = with_timeout(s.run(&mut launcher, &options)).await?;

    assert!(!ok);
    assert_eq!(s.node(failing).and_then(|n| n.exit_code()), Some(2));
    assert_eq!(s.state_of(sleeper), Some(ProcessState::Error));
    assert_eq!(s.node(sleeper).and_then(|n| n.exit_code()), Some(FAILED_EXIT_CODE));
    Ok(())
}

#[tokio::test]
async fn abandon_policy_returns_while_jobs_still_run() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let marker = dir.path().join("slow-done");
    let script = format!("sleep 0.5; touch '{}'", marker.display());

    let mut s = Scheduler::with_captured_env();
    let slow = s.add_named_node("slow", ["sh", "-c", script.as_str()], &[])?;
    let failing = s.add_named_node("failing", ["false"], &[])?;

    let mut launcher = OsLauncher::new();
    let options = RunOptions::default()
        .with_jobs(2)
        .with_failure_policy(FailurePolicy::Abandon);
    let ok = with_timeout(s.run(&mut launcher, &options)).await?;

    assert!(!ok);
    assert_eq!(s.node(failing).and_then(|n| n.exit_code()), Some(1));
    assert_eq!(s.state_of(slow), Some(ProcessState::Running));
    assert!(s.node(slow).is_some_and(|n| n.is_abandoned()));
    assert_eq!(s.summary().abandoned, vec!["slow".to_string()]);
    assert!(!marker.exists(), "run waited for the abandoned job");

    // Nothing is left to collect, even though the job is still going.
    let err = launcher.wait_any().await.expect_err("only detached processes");
    assert!(matches!(err, JobdagError::NothingInFlight));

    // The abandoned job runs to completion and the launcher forgets it.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(marker.exists());
    assert_eq!(launcher.live_count(), 0);
    Ok(())
}

#[tokio::test]
async fn detaching_an_exited_process_discards_its_exit() -> TestResult {
    let mut launcher = OsLauncher::new();
    let env = Environment::capture();

    let quick = launcher.spawn(&argv(&["true"]), &env)?;
    let slow = launcher.spawn(&argv(&["sh", "-c", "sleep 0.3"]), &env)?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    launcher.detach(quick);

    let exit = with_timeout(launcher.wait_any()).await?;
    assert_eq!(exit.handle, slow);
    assert_eq!(launcher.live_count(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_binary_fails_the_run() -> TestResult {
    init_tracing();
    let mut s = Scheduler::with_captured_env();
    let missing = s.add_named_node("missing", ["jobdag-definitely-not-a-real-binary"], &[])?;

    let mut launcher = OsLauncher::new();
    let ok = with_timeout(s.run(&mut launcher, &RunOptions::default())).await?;

    assert!(!ok);
    assert_eq!(s.state_of(missing), Some(ProcessState::Error));
    assert_eq!(s.node(missing).and_then(|n| n.exit_code()), None);
    Ok(())
}

#[tokio::test]
async fn wait_any_with_nothing_in_flight_errors() {
    let mut launcher = OsLauncher::new();
    let err = launcher.wait_any().await.expect_err("nothing launched");
    assert!(matches!(err, JobdagError::NothingInFlight));
}

#[tokio::test]
async fn launcher_reports_exits_by_handle() -> TestResult {
    let mut launcher = OsLauncher::new();
    let env = Environment::capture();

    let slow = launcher.spawn(&argv(&["sh", "-c", "sleep 0.3; exit 1"]), &env)?;
    let fast = launcher.spawn(&argv(&["true"]), &env)?;
    assert_ne!(slow, fast);
    assert_eq!(launcher.live_count(), 2);

    let first = with_timeout(launcher.wait_any()).await?;
    assert_eq!(first.handle, fast);
    assert!(first.success());

    let second = with_timeout(launcher.wait_any()).await?;
    assert_eq!(second.handle, slow);
    assert_eq!(second.code, 1);
    assert_eq!(launcher.live_count(), 0);

    // Exited handles are ignored.
    launcher.signal(slow, jobdag::Signal::Kill)?;
    Ok(())
}

#[tokio::test]
async fn run_entry_point_executes_a_job_file() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log = dir.path().join("run.log");
    let config = dir.path().join("Jobdag.toml");

    let first = format!("echo first >> '{}'", log.display());
    let second = format!("echo second >> '{}'", log.display());
    let cfg_text = format!(
        "[config]\njobs = 2\n\n[job.first]\ncmd = {first:?}\n\n[job.second]\ncmd = {second:?}\nafter = [\"first\"]\n"
    );
    fs::write(&config, cfg_text)?;

    let config_arg = config.display().to_string();
    let args = CliArgs::parse_from(["jobdag", "--config", config_arg.as_str()]);
    let ok = with_timeout(jobdag::run(args)).await?;

    assert!(ok);
    assert_eq!(log_lines(&log)?, vec!["first", "second"]);

    // Dry run validates but runs nothing.
    fs::remove_file(&log)?;
    let args = CliArgs::parse_from(["jobdag", "--config", config_arg.as_str(), "--dry-run"]);
    assert!(with_timeout(jobdag::run(args)).await?);
    assert!(!log.exists());
    Ok(())
}

#[tokio::test]
async fn run_entry_point_reports_invalid_job_files() -> TestResult {
    let dir = TempDir::new()?;
    let config = dir.path().join("Jobdag.toml");
    fs::write(&config, "[job.a]\ncmd = [\"true\"]\nafter = [\"a\"]\n")?;

    let config_arg = config.display().to_string();
    let args = CliArgs::parse_from(["jobdag", "--config", config_arg.as_str()]);
    let err = with_timeout(jobdag::run(args)).await.expect_err("self dependency");
    assert!(format!("{err:#}").contains("itself"), "{err:#}");
    Ok(())
}

#[tokio::test]
async fn job_file_graph_runs_end_to_end() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let log = dir.path().join("graph.log");
    let line = |name: &str| format!("echo {name} >> '{}'", log.display());

    let cfg = JobFileBuilder::new()
        .jobs(3)
        .with_job("fetch", JobConfigBuilder::shell(&line("fetch")).build())
        .with_job("build", JobConfigBuilder::shell(&line("build")).after("fetch").build())
        .with_job("docs", JobConfigBuilder::shell(&line("docs")).after("fetch").build())
        .with_job(
            "package",
            JobConfigBuilder::shell(&line("package"))
                .after("build")
                .after("docs")
                .build(),
        )
        .build();

    let mut s = Scheduler::from_config(&cfg, Environment::capture())?;
    let mut launcher = OsLauncher::new();
    let ok = with_timeout(s.run(&mut launcher, &RunOptions::from_config(&cfg.config))).await?;

    assert!(ok);
    let lines = log_lines(&log)?;
    assert_eq!(lines.len(), 4);
    assert_eq!(lines.first().map(String::as_str), Some("fetch"));
    assert_eq!(lines.last().map(String::as_str), Some("package"));
    Ok(())
}
