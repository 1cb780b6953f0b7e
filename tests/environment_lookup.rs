// tests/environment_lookup.rs

use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use jobdag::exec::Environment;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

fn env_with_path(dirs: &[&TempDir]) -> Result<Environment, Box<dyn Error>> {
    let path = std::env::join_paths(dirs.iter().map(|d| d.path()))?;
    Ok(Environment::new().with_var("PATH", path))
}

#[test]
fn bare_name_is_found_on_path() -> TestResult {
    let first = TempDir::new()?;
    let second = TempDir::new()?;
    let tool = second.path().join("mytool");
    fs::write(&tool, "#!/bin/sh\n")?;

    let env = env_with_path(&[&first, &second])?;
    assert_eq!(env.resolve_executable("mytool"), tool);
    Ok(())
}

#[test]
fn first_match_on_path_wins() -> TestResult {
    let first = TempDir::new()?;
    let second = TempDir::new()?;
    fs::write(first.path().join("mytool"), "")?;
    fs::write(second.path().join("mytool"), "")?;

    let env = env_with_path(&[&first, &second])?;
    assert_eq!(env.resolve_executable("mytool"), first.path().join("mytool"));
    Ok(())
}

#[test]
fn directories_are_skipped() -> TestResult {
    let first = TempDir::new()?;
    let second = TempDir::new()?;
    fs::create_dir(first.path().join("mytool"))?;
    fs::write(second.path().join("mytool"), "")?;

    let env = env_with_path(&[&first, &second])?;
    assert_eq!(env.resolve_executable("mytool"), second.path().join("mytool"));
    Ok(())
}

#[test]
fn names_with_a_slash_are_used_verbatim() -> TestResult {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("run.sh"), "")?;

    let env = env_with_path(&[&dir])?;
    assert_eq!(env.resolve_executable("./run.sh"), PathBuf::from("./run.sh"));
    assert_eq!(
        env.resolve_executable("/opt/bin/run.sh"),
        PathBuf::from("/opt/bin/run.sh")
    );
    Ok(())
}

#[test]
fn unresolved_names_are_returned_unchanged() -> TestResult {
    let dir = TempDir::new()?;

    let env = env_with_path(&[&dir])?;
    assert_eq!(env.resolve_executable("nope"), PathBuf::from("nope"));

    let no_path = Environment::new();
    assert_eq!(no_path.resolve_executable("sh"), PathBuf::from("sh"));
    Ok(())
}

#[test]
fn setting_a_variable_replaces_it() {
    let mut env = Environment::from_vars([("A", "1"), ("B", "2")]);
    env.set("A", "3");

    assert_eq!(env.len(), 2);
    assert_eq!(env.get("A"), Some(OsStr::new("3")));

    let pairs: Vec<_> = env.iter().collect();
    assert_eq!(
        pairs,
        vec![
            (OsStr::new("A"), OsStr::new("3")),
            (OsStr::new("B"), OsStr::new("2")),
        ]
    );
}

#[test]
fn capture_matches_the_current_process() {
    let env = Environment::capture();

    if let Some(path) = std::env::var_os("PATH") {
        assert_eq!(env.get("PATH"), Some(path.as_os_str()));
    }
    assert!(Environment::new().is_empty());
}
