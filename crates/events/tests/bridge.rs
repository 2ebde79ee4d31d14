//! Integration tests for the bridge: submission rules, routing of worker
//! output into events, and directory browsing.
//!
//! Workers are shell scripts run through `sh` from a temporary scripts
//! directory.

#![cfg(unix)]

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use assert_matches::assert_matches;
use benchbridge_core::directory::PromptPicker;
use benchbridge_core::{CoreError, JobId, JobKind, QueryLine};
use benchbridge_dispatcher::WorkerConfig;
use benchbridge_events::{Bridge, BridgeConfig, BridgeError, BridgeEvent, EventPayload};
use tempfile::TempDir;
use tokio::sync::broadcast;

const SCENARIO_ROW: &str = r#"[{"Embedding Model":"all-MiniLM-L6-v2","DB Type":"Test","Strategy":"cosine","Average k":4,"Sigma":1,"Frequency":3,"Queries":1}]"#;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scripts_dir(combination: &str, query_generation: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join("Combination.py"), combination).expect("write script");
    std::fs::write(dir.path().join("QueryGeneration.py"), query_generation)
        .expect("write script");
    dir
}

fn bridge(dir: &Path) -> Bridge {
    Bridge::new(BridgeConfig {
        worker: WorkerConfig {
            interpreter: "sh".to_string(),
            interpreter_args: Vec::new(),
            scripts_dir: dir.to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    })
}

fn one_line() -> Vec<QueryLine> {
    vec![QueryLine::new("q1", "doc1")]
}

/// Collect the events of each job in `job_ids` up to and including its
/// terminal event.
async fn jobs_events(
    rx: &mut broadcast::Receiver<BridgeEvent>,
    job_ids: &[JobId],
) -> HashMap<JobId, Vec<EventPayload>> {
    tokio::time::timeout(Duration::from_secs(10), async {
        let mut events: HashMap<JobId, Vec<EventPayload>> = HashMap::new();
        let mut finished = 0;
        while finished < job_ids.len() {
            let event = rx.recv().await.expect("event bus open");
            let Some(job_id) = event.job_id().filter(|id| job_ids.contains(id)) else {
                continue;
            };
            if event.is_terminal() {
                finished += 1;
            }
            events.entry(job_id).or_default().push(event.payload);
        }
        events
    })
    .await
    .expect("jobs finished in time")
}

async fn job_events(rx: &mut broadcast::Receiver<BridgeEvent>, job_id: JobId) -> Vec<EventPayload> {
    jobs_events(rx, &[job_id])
        .await
        .remove(&job_id)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn benchmark_scenario_appends_one_row() {
    let dir = scripts_dir(
        &format!("printf '%s' \"$1\" > argument.json\necho '{SCENARIO_ROW}'\n"),
        "",
    );
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let job_id = bridge
        .submit_benchmark("all-MiniLM-L6-v2", "cosine", "/data", one_line())
        .await
        .expect("submit");
    assert!(bridge.benchmark_running());

    let events = job_events(&mut rx, job_id).await;
    assert_eq!(events.len(), 3);
    assert_matches!(&events[0], EventPayload::BenchmarkStarted { model, strategy, path, .. }
        if model == "all-MiniLM-L6-v2" && strategy == "cosine" && path == "/data");
    assert_matches!(&events[1], EventPayload::BenchmarkResult { row, .. }
        if row.embedding_model == "all-MiniLM-L6-v2" && row.db_type == "Test");
    assert_matches!(events[2], EventPayload::BenchmarkFinished { rows: 1, .. });

    let argument = std::fs::read_to_string(dir.path().join("argument.json")).expect("argument");
    assert_eq!(
        argument,
        r#"{"selectedModel":"all-MiniLM-L6-v2","selectedStrategy":"cosine","selectedPath":"/data","lines":[{"query":"q1","source":"doc1"}]}"#
    );

    let rows = bridge.results();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.strategy, "cosine");
    assert_eq!(row.average_k, 4.0);
    assert_eq!(row.sigma, 1.0);
    assert_eq!(row.frequency, 3.0);
    assert_eq!(row.queries, 1);
    assert!(!bridge.benchmark_running());
}

#[tokio::test]
async fn second_benchmark_is_rejected_until_first_is_cancelled() {
    let dir = scripts_dir("sleep 30\n", "");
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();
    let mut running = bridge.watch_benchmark_running();

    let job_id = bridge
        .submit_benchmark("m", "l2", "/data", one_line())
        .await
        .expect("first submit");
    running.changed().await.expect("gate alive");
    assert!(*running.borrow_and_update());

    let second = bridge.submit_benchmark("m", "l2", "/data", one_line()).await;
    assert_matches!(second, Err(BridgeError::BenchmarkInProgress));

    assert!(bridge.cancel(job_id).await);
    let events = job_events(&mut rx, job_id).await;
    assert_matches!(events.last(), Some(EventPayload::JobFailed { code, kind: JobKind::Benchmark, .. })
        if code == "CANCELLED");
    assert!(!bridge.benchmark_running());

    let third = bridge
        .submit_benchmark("m", "l2", "/data", one_line())
        .await
        .expect("gate reopened");
    bridge.shutdown().await;
    assert_ne!(third, job_id);
}

#[tokio::test]
async fn failed_benchmark_reports_exit_code_and_reopens_gate() {
    let dir = scripts_dir("echo 'No module named faiss' >&2\nexit 1\n", "");
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let job_id = bridge
        .submit_benchmark("m", "l2", "/data", one_line())
        .await
        .expect("submit");
    let events = job_events(&mut rx, job_id).await;

    assert_matches!(
        events.last(),
        Some(EventPayload::JobFailed { exit_code: 1, code, error, .. })
            if code == "WORKER_EXIT_FAILURE" && error.contains("faiss")
    );
    assert!(!bridge.benchmark_running());
    assert!(bridge.results().is_empty());
}

#[tokio::test]
async fn malformed_lines_do_not_stop_later_results() {
    let dir = scripts_dir(
        &format!("echo 'loading model...'\necho ''\necho '[]'\necho '{SCENARIO_ROW}'\n"),
        "",
    );
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let job_id = bridge
        .submit_benchmark("m", "cosine", "/data", one_line())
        .await
        .expect("submit");
    let events = job_events(&mut rx, job_id).await;

    let malformed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EventPayload::MalformedMessage { raw, .. } => Some(raw.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(malformed, vec!["loading model...", "[]"]);
    assert_matches!(events.last(), Some(EventPayload::BenchmarkFinished { rows: 1, .. }));
    assert_eq!(bridge.results().len(), 1);
}

#[tokio::test]
async fn incomplete_benchmark_form_is_rejected() {
    let dir = scripts_dir("", "");
    let bridge = bridge(dir.path());

    let result = bridge.submit_benchmark("", "l2", "/data", one_line()).await;
    assert_matches!(result, Err(BridgeError::Core(CoreError::Validation(_))));

    let result = bridge
        .submit_benchmark("m", "l2", "/data", vec![QueryLine::new("q", " ")])
        .await;
    assert_matches!(result, Err(BridgeError::Core(CoreError::Validation(_))));
    assert!(!bridge.benchmark_running());
}

// ---------------------------------------------------------------------------
// Query generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generated_query_routes_to_its_line() {
    let dir = scripts_dir("", "echo '[\"generated text\", 2]'\n");
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let job_id = bridge
        .submit_query_generation("/data", "doc1", 2)
        .await
        .expect("submit");
    assert_eq!(bridge.pending_lines(), vec![2]);

    let events = job_events(&mut rx, job_id).await;
    assert_eq!(
        events,
        vec![
            EventPayload::QueryGenerationStarted {
                job_id,
                line_index: 2
            },
            EventPayload::QueryGenerated {
                job_id,
                text: "generated text".to_string(),
                line_index: 2
            },
            EventPayload::QueryGenerationFinished {
                job_id,
                line_index: 2
            },
        ]
    );
    assert!(bridge.pending_lines().is_empty());
}

#[tokio::test]
async fn answer_for_another_line_is_malformed() {
    let dir = scripts_dir("", "echo '[\"stray\", 5]'\n");
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let job_id = bridge
        .submit_query_generation("/data", "doc1", 1)
        .await
        .expect("submit");
    let events = job_events(&mut rx, job_id).await;

    assert!(!events
        .iter()
        .any(|e| matches!(e, EventPayload::QueryGenerated { .. })));
    assert_matches!(&events[1], EventPayload::MalformedMessage { kind: JobKind::QueryGeneration, error, .. }
        if error.contains("line 5"));
}

#[tokio::test]
async fn concurrent_generations_stay_on_their_lines() {
    let dir = scripts_dir(
        "",
        "idx=$(printf '%s' \"$1\" | sed 's/.*\"index\":\\([0-9]*\\).*/\\1/')\necho \"[\\\"query for $idx\\\", $idx]\"\n",
    );
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let mut jobs = Vec::new();
    for line in 0..3 {
        let job_id = bridge
            .submit_query_generation("/data", format!("doc{line}"), line)
            .await
            .expect("submit");
        jobs.push((line, job_id));
    }

    let ids: Vec<_> = jobs.iter().map(|(_, job_id)| *job_id).collect();
    let mut events = jobs_events(&mut rx, &ids).await;

    for (line, job_id) in jobs {
        let generated: Vec<_> = events
            .remove(&job_id)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|e| match e {
                EventPayload::QueryGenerated {
                    text, line_index, ..
                } => Some((text, line_index)),
                _ => None,
            })
            .collect();
        assert_eq!(generated, vec![(format!("query for {line}"), line)]);
    }
}

#[tokio::test]
async fn busy_line_is_rejected_and_released_on_shutdown() {
    let dir = scripts_dir("", "sleep 30\n");
    let bridge = bridge(dir.path());
    let mut rx = bridge.subscribe();

    let first = bridge
        .submit_query_generation("/data", "doc1", 0)
        .await
        .expect("line 0");
    let busy = bridge.submit_query_generation("/data", "doc1", 0).await;
    assert_matches!(busy, Err(BridgeError::LineBusy(0)));
    let second = bridge
        .submit_query_generation("/data", "doc2", 1)
        .await
        .expect("line 1");
    assert_eq!(bridge.pending_lines(), vec![0, 1]);
    assert_eq!(bridge.active_jobs().await.len(), 2);

    bridge.shutdown().await;

    let mut events = jobs_events(&mut rx, &[first, second]).await;
    for job_id in [first, second] {
        let events = events.remove(&job_id).unwrap_or_default();
        assert_matches!(events.last(), Some(EventPayload::JobFailed { code, .. }) if code == "CANCELLED");
    }
    assert!(bridge.pending_lines().is_empty());
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_directory_returns_exact_names() {
    let scripts = scripts_dir("", "");
    let data = tempfile::tempdir().expect("create temp dir");
    std::fs::write(data.path().join("b.txt"), "b").expect("write");
    std::fs::write(data.path().join("a.txt"), "a").expect("write");

    let bridge = bridge(scripts.path());
    let mut rx = bridge.subscribe();

    let entries = bridge.list_directory(data.path()).await.expect("list");
    assert_eq!(entries, vec!["a.txt", "b.txt"]);

    let event = rx.recv().await.expect("event");
    assert_matches!(event.payload, EventPayload::DirectoryListed { entries, .. }
        if entries == vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn unreadable_directory_is_reported() {
    let scripts = scripts_dir("", "");
    let bridge = bridge(scripts.path());

    let result = bridge
        .list_directory(scripts.path().join("does-not-exist"))
        .await;
    assert_matches!(result, Err(BridgeError::Core(CoreError::DirectoryRead { .. })));
}

#[tokio::test]
async fn open_directory_uses_picker() {
    let scripts = scripts_dir("", "");
    let data = tempfile::tempdir().expect("create temp dir");
    std::fs::create_dir(data.path().join("docs")).expect("mkdir");
    let bridge = bridge(scripts.path());

    let mut picker = PromptPicker::new(&b"docs\n\n"[..], data.path());
    let picked = bridge
        .open_directory(&mut picker)
        .await
        .expect("pick")
        .expect("a directory");
    assert!(picked.is_absolute());
    assert!(picked.ends_with("docs"));

    let cancelled = bridge.open_directory(&mut picker).await.expect("pick");
    assert!(cancelled.is_none());
}
