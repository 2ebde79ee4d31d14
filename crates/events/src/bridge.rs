//! Session facade used by the presentation layer.
//!
//! [`Bridge`] validates form input, enforces the one-benchmark-at-a-time and
//! one-job-per-line rules, hands jobs to the [`Dispatcher`], and spawns a
//! routing task per job that turns worker output into [`BridgeEvent`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use benchbridge_core::directory::{list_entries, DirectoryPicker};
use benchbridge_core::{
    BenchmarkRequest, BenchmarkRow, JobId, LineIndex, QueryGenerationRequest, QueryLine,
};
use benchbridge_dispatcher::{Dispatcher, JobSummary};
use tokio::sync::{broadcast, watch};
use tokio_util::task::TaskTracker;

use crate::bus::{BridgeEvent, EventBus, EventPayload};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::gate::BenchmarkGate;
use crate::pending::PendingLines;
use crate::routing::{route_benchmark, route_query_generation};
use crate::table::ResultTable;

pub struct Bridge {
    dispatcher: Dispatcher,
    bus: Arc<EventBus>,
    gate: BenchmarkGate,
    pending: PendingLines,
    results: ResultTable,
    routers: TaskTracker,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config.worker),
            bus: Arc::new(EventBus::new(config.event_capacity)),
            gate: BenchmarkGate::new(),
            pending: PendingLines::new(),
            results: ResultTable::new(),
            routers: TaskTracker::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(BridgeConfig::from_env())
    }

    /// Receive every event published from now on. Subscribe before
    /// submitting to be sure to see a job's first event.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.bus.subscribe()
    }

    // ---- directories ----

    /// Ask `picker` for a directory. `None` means the user cancelled.
    pub async fn open_directory<P: DirectoryPicker>(
        &self,
        picker: &mut P,
    ) -> Result<Option<PathBuf>, BridgeError> {
        Ok(picker.select_directory().await?)
    }

    /// List the immediate children of `path` and publish them as
    /// [`EventPayload::DirectoryListed`].
    pub async fn list_directory(&self, path: impl AsRef<Path>) -> Result<Vec<String>, BridgeError> {
        let path = path.as_ref();
        let entries = list_entries(path).await?;
        self.bus.publish(EventPayload::DirectoryListed {
            path: path.display().to_string(),
            entries: entries.clone(),
        });
        Ok(entries)
    }

    // ---- jobs ----

    /// Start a benchmark run.
    ///
    /// Fails with [`BridgeError::BenchmarkInProgress`] while another
    /// benchmark is running, and with a validation error for incomplete
    /// input. Results arrive as [`EventPayload::BenchmarkResult`] events.
    pub async fn submit_benchmark(
        &self,
        model: impl Into<String>,
        strategy: impl Into<String>,
        directory_path: impl Into<String>,
        lines: Vec<QueryLine>,
    ) -> Result<JobId, BridgeError> {
        let request = BenchmarkRequest::new(model, strategy, directory_path, lines)?;
        let permit = self
            .gate
            .try_acquire()
            .ok_or(BridgeError::BenchmarkInProgress)?;

        let model = request.model().to_string();
        let strategy = request.strategy().to_string();
        let path = request.directory_path().to_string();

        let handle = self.dispatcher.submit(request.into()).await;
        let job_id = handle.id();
        self.bus.publish(EventPayload::BenchmarkStarted {
            job_id,
            model,
            strategy,
            path,
        });

        self.routers.spawn(route_benchmark(
            handle,
            Arc::clone(&self.bus),
            self.results.clone(),
            permit,
        ));

        Ok(job_id)
    }

    /// Generate a query for form line `line_index` from `source_file`.
    ///
    /// Fails with [`BridgeError::LineBusy`] while a generation for the same
    /// line is running. The query arrives as
    /// [`EventPayload::QueryGenerated`] for that line only.
    pub async fn submit_query_generation(
        &self,
        directory_path: impl Into<String>,
        source_file: impl Into<String>,
        line_index: LineIndex,
    ) -> Result<JobId, BridgeError> {
        let request = QueryGenerationRequest::new(directory_path, source_file, line_index)?;
        let claim = self
            .pending
            .try_claim(line_index)
            .ok_or(BridgeError::LineBusy(line_index))?;

        let handle = self.dispatcher.submit(request.into()).await;
        let job_id = handle.id();
        self.bus
            .publish(EventPayload::QueryGenerationStarted { job_id, line_index });

        self.routers
            .spawn(route_query_generation(handle, Arc::clone(&self.bus), claim));

        Ok(job_id)
    }

    /// Cancel a running job. Returns `false` if it is unknown or finished.
    pub async fn cancel(&self, job_id: JobId) -> bool {
        self.dispatcher.cancel(job_id).await
    }

    pub async fn active_jobs(&self) -> Vec<JobSummary> {
        self.dispatcher.active_jobs().await
    }

    // ---- state ----

    /// Rows received so far, across all benchmark runs.
    pub fn results(&self) -> Vec<BenchmarkRow> {
        self.results.snapshot()
    }

    pub fn clear_results(&self) {
        self.results.clear();
    }

    pub fn benchmark_running(&self) -> bool {
        self.gate.is_running()
    }

    pub fn watch_benchmark_running(&self) -> watch::Receiver<bool> {
        self.gate.watch()
    }

    /// Line indices with a query-generation job still running.
    pub fn pending_lines(&self) -> Vec<LineIndex> {
        self.pending.snapshot()
    }

    /// Kill all running workers and wait until every job has published its
    /// terminal event.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.routers.close();
        self.routers.wait().await;
        tracing::info!("Bridge shut down");
    }
}
