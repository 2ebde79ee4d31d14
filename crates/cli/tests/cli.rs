//! End-to-end runs of the command line against fake shell workers.

#![cfg(unix)]

use std::path::Path;
use std::process::ExitCode;

use benchbridge_cli::{run, Cli};
use clap::Parser;
use tempfile::TempDir;

fn scripts_dir(combination: &str, query_generation: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join("Combination.py"), combination).expect("write script");
    std::fs::write(dir.path().join("QueryGeneration.py"), query_generation)
        .expect("write script");
    dir
}

fn cli(scripts: &Path, args: &[&str]) -> Cli {
    let scripts = scripts.to_str().expect("utf-8 temp path");
    let mut argv = vec!["benchbridge", "--interpreter", "sh", "--scripts-dir", scripts];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).expect("valid command line")
}

fn same(a: ExitCode, b: ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}

#[tokio::test]
async fn ls_lists_existing_directory() {
    let scripts = scripts_dir("", "");
    let path = scripts.path().to_str().expect("utf-8 temp path");

    let code = run(cli(scripts.path(), &["ls", path])).await.expect("ls");
    assert!(same(code, ExitCode::SUCCESS));
}

#[tokio::test]
async fn ls_on_missing_directory_is_an_error() {
    let scripts = scripts_dir("", "");
    let missing = scripts.path().join("missing");

    let result = run(cli(
        scripts.path(),
        &["ls", missing.to_str().expect("utf-8 temp path")],
    ))
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn generate_succeeds_when_worker_answers() {
    let scripts = scripts_dir("", "echo '[\"what is x?\", 2]'\n");

    let code = run(cli(
        scripts.path(),
        &["generate", "-p", "/data", "-s", "doc1", "-i", "2"],
    ))
    .await
    .expect("generate");
    assert!(same(code, ExitCode::SUCCESS));
}

#[tokio::test]
async fn failing_benchmark_exits_non_zero() {
    let scripts = scripts_dir("exit 1\n", "");

    let code = run(cli(
        scripts.path(),
        &[
            "benchmark",
            "-m",
            "not-a-known-model",
            "-s",
            "l2",
            "-p",
            "/data",
            "-l",
            "q1=>doc1",
        ],
    ))
    .await
    .expect("benchmark");
    assert!(same(code, ExitCode::FAILURE));
}

#[tokio::test]
async fn invalid_form_is_rejected_before_spawning() {
    let scripts = scripts_dir("echo should-not-run\n", "");

    let result = run(cli(
        scripts.path(),
        &["benchmark", "-m", " ", "-s", "l2", "-p", "/data", "-l", "q1=>doc1"],
    ))
    .await;
    assert!(result.is_err());
}
