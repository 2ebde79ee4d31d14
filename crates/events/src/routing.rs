//! Worker output routing.
//!
//! Each submitted job gets one routing task that drains its
//! [`JobHandle`], interprets every stdout line according to the job kind,
//! and turns the result into [`BridgeEvent`](crate::BridgeEvent)s. A line
//! that cannot be interpreted is reported and skipped; it never stops the
//! stream.

use std::sync::Arc;

use benchbridge_core::messages::{parse_benchmark_message, parse_generated_query};
use benchbridge_core::{JobKind, LineIndex, ResultMessage};
use benchbridge_dispatcher::{JobHandle, ProcessOutcome};

use crate::bus::{EventBus, EventPayload};
use crate::gate::BenchmarkPermit;
use crate::pending::LineClaim;
use crate::table::ResultTable;

/// Route a benchmark job until it ends. Holding `permit` keeps the
/// benchmark gate closed for exactly as long as this runs.
pub(crate) async fn route_benchmark(
    mut handle: JobHandle,
    bus: Arc<EventBus>,
    table: ResultTable,
    permit: BenchmarkPermit,
) {
    let job_id = handle.id();
    let mut rows = 0usize;

    while let Some(msg) = handle.next_message().await {
        if skip_blank(&msg) {
            continue;
        }
        match parse_benchmark_message(&msg.line) {
            Ok(row) => {
                tracing::info!(
                    %job_id,
                    model = %row.embedding_model,
                    db_type = %row.db_type,
                    strategy = %row.strategy,
                    "Benchmark result received",
                );
                rows += 1;
                table.push(row.clone());
                bus.publish(EventPayload::BenchmarkResult { job_id, row });
            }
            Err(e) => report_malformed(&bus, &msg, JobKind::Benchmark, e.to_string()),
        }
    }

    let outcome = handle.outcome().await;
    // Reopen the gate before announcing the end so that a listener reacting
    // to the terminal event can submit the next benchmark.
    drop(permit);
    if outcome.is_success() {
        bus.publish(EventPayload::BenchmarkFinished { job_id, rows });
    } else {
        report_failure(&bus, outcome, None);
    }
}

/// Route a query-generation job until it ends. `claim` keeps the form line
/// marked as pending meanwhile.
pub(crate) async fn route_query_generation(
    mut handle: JobHandle,
    bus: Arc<EventBus>,
    claim: LineClaim,
) {
    let job_id = handle.id();
    let line_index = claim.line_index();

    while let Some(msg) = handle.next_message().await {
        if skip_blank(&msg) {
            continue;
        }
        match parse_generated_query(&msg.line) {
            Ok(query) if query.line_index == line_index => {
                tracing::info!(%job_id, line_index, "Query generated");
                bus.publish(EventPayload::QueryGenerated {
                    job_id,
                    text: query.text,
                    line_index,
                });
            }
            Ok(query) => report_malformed(
                &bus,
                &msg,
                JobKind::QueryGeneration,
                format!(
                    "line index mismatch: job is for line {line_index}, worker answered for line {}",
                    query.line_index
                ),
            ),
            Err(e) => report_malformed(&bus, &msg, JobKind::QueryGeneration, e.to_string()),
        }
    }

    let outcome = handle.outcome().await;
    drop(claim);
    if outcome.is_success() {
        bus.publish(EventPayload::QueryGenerationFinished { job_id, line_index });
    } else {
        report_failure(&bus, outcome, Some(line_index));
    }
}

fn skip_blank(msg: &ResultMessage) -> bool {
    if msg.is_blank() {
        tracing::debug!(job_id = %msg.job_id, seq = msg.seq, "Skipping blank worker line");
        return true;
    }
    false
}

fn report_malformed(bus: &EventBus, msg: &ResultMessage, kind: JobKind, error: String) {
    tracing::warn!(
        job_id = %msg.job_id,
        %kind,
        seq = msg.seq,
        error = %error,
        raw_message = %msg.line,
        "Failed to parse worker message",
    );
    bus.publish(EventPayload::MalformedMessage {
        job_id: msg.job_id,
        kind,
        raw: msg.line.clone(),
        error,
    });
}

fn report_failure(bus: &EventBus, outcome: ProcessOutcome, line_index: Option<LineIndex>) {
    let Some(error) = outcome.error else {
        return;
    };
    bus.publish(EventPayload::JobFailed {
        job_id: outcome.job_id,
        kind: outcome.kind,
        line_index,
        code: error.code().to_string(),
        error: error.to_string(),
        exit_code: outcome.exit_code,
        signal: outcome.signal,
    });
}
