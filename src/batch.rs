//! Batch orchestration over a matched set of recordings.
//!
//! Runs the extraction pipeline across every (participant, file) pair,
//! sequentially by default or over a small worker pool, and guarantees one
//! row per pair in the output no matter what any individual file does. The
//! only fatal condition in a run is an unusable label table, which is
//! handled before the batch ever starts.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use sysinfo::System;

use crate::features::{FeatureRecord, FeatureTable, ParticipantId};
use crate::pipeline::FeatureExtractionPipeline;
use crate::toolkit::AcousticToolkit;

/// System memory watcher. Readings are advisory: crossing the threshold
/// logs a warning and bumps a counter, it never stops the batch.
pub struct MemoryMonitor {
    system: Mutex<System>,
    threshold_percent: f64,
    pressure_events: AtomicUsize,
}

impl MemoryMonitor {
    pub fn new(threshold_percent: f64) -> Self {
        Self {
            system: Mutex::new(System::new()),
            threshold_percent,
            pressure_events: AtomicUsize::new(0),
        }
    }

    /// Current system memory usage as a percentage (0-100).
    pub fn usage_percent(&self) -> f64 {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return 0.0;
        }
        system.used_memory() as f64 / total as f64 * 100.0
    }

    /// Sample usage and record a pressure event if above the threshold.
    pub fn check(&self) -> Option<f64> {
        let usage = self.usage_percent();
        if usage > self.threshold_percent {
            self.pressure_events.fetch_add(1, Ordering::Relaxed);
            Some(usage)
        } else {
            None
        }
    }

    pub fn pressure_events(&self) -> usize {
        self.pressure_events.load(Ordering::Relaxed)
    }
}

/// One unit of batch work.
pub type WorkItem = (ParticipantId, PathBuf);

/// Advisory response to a memory-pressure reading, invoked with the usage
/// percentage. Must not block; the batch continues regardless.
pub type PressureCallback = dyn Fn(f64) + Send + Sync;

pub struct BatchRunner<T: AcousticToolkit> {
    pipeline: Arc<FeatureExtractionPipeline<T>>,
    memory: Arc<MemoryMonitor>,
    on_pressure: Arc<PressureCallback>,
    workers: usize,
    progress_interval: usize,
}

impl<T: AcousticToolkit + 'static> BatchRunner<T> {
    pub fn new(pipeline: FeatureExtractionPipeline<T>) -> Self {
        let config = pipeline.config();
        let memory = Arc::new(MemoryMonitor::new(config.memory_threshold_percent));
        let workers = config.workers.max(1);
        let progress_interval = config.progress_interval.max(1);
        Self {
            pipeline: Arc::new(pipeline),
            memory,
            on_pressure: Arc::new(|usage| {
                tracing::warn!(
                    usage_percent = format!("{usage:.1}"),
                    "system memory running high"
                );
            }),
            workers,
            progress_interval,
        }
    }

    /// Replace the default log-only pressure response.
    pub fn with_pressure_callback(
        mut self,
        callback: impl Fn(f64) + Send + Sync + 'static,
    ) -> Self {
        self.on_pressure = Arc::new(callback);
        self
    }

    pub fn memory(&self) -> &MemoryMonitor {
        &self.memory
    }

    /// Process every work item and return the table sorted by id.
    ///
    /// Exactly one record per item comes back: decode errors, analysis
    /// failures, and even panics inside the pipeline all degrade to an
    /// all-missing row for that participant.
    pub fn run(&self, items: Vec<WorkItem>) -> FeatureTable {
        let total = items.len();
        let started = Instant::now();
        tracing::info!(total, workers = self.workers, "starting batch extraction");

        let mut table = if self.workers <= 1 {
            self.run_sequential(items, started)
        } else {
            self.run_parallel(items, started)
        };
        table.sort_by_id();

        tracing::info!(
            rows = table.len(),
            elapsed_s = format!("{:.1}", started.elapsed().as_secs_f64()),
            memory_pressure_events = self.memory.pressure_events(),
            "batch extraction complete"
        );
        table
    }

    fn run_sequential(&self, items: Vec<WorkItem>, started: Instant) -> FeatureTable {
        let total = items.len();
        let mut table = FeatureTable::new();
        for (done, (id, path)) in items.into_iter().enumerate() {
            check_memory(&self.memory, &*self.on_pressure);
            table.push(self.process_one(id, &path));
            self.after_item(done + 1, total, started);
        }
        table
    }

    fn run_parallel(&self, items: Vec<WorkItem>, started: Instant) -> FeatureTable {
        let total = items.len();
        let items = Arc::new(items);
        let next = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let runner = self.clone_refs();
            let items = Arc::clone(&items);
            let next = Arc::clone(&next);
            let done = Arc::clone(&done);
            handles.push(std::thread::spawn(move || {
                let mut records = Vec::new();
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some((id, path)) = items.get(index) else {
                        break;
                    };
                    check_memory(&runner.memory, &*runner.on_pressure);
                    records.push(runner.process_one(*id, path));
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    runner.after_item(finished, total, started);
                }
                records
            }));
        }

        let mut table = FeatureTable::new();
        for handle in handles {
            match handle.join() {
                Ok(records) => {
                    for record in records {
                        table.push(record);
                    }
                }
                Err(_) => tracing::error!("extraction worker thread panicked"),
            }
        }
        // A crashed worker drops the records it was carrying; restore the
        // one-row-per-item guarantee with all-missing rows.
        backfill_missing_rows(&mut table, &items);
        table
    }

    fn clone_refs(&self) -> BatchWorker<T> {
        BatchWorker {
            pipeline: Arc::clone(&self.pipeline),
            memory: Arc::clone(&self.memory),
            on_pressure: Arc::clone(&self.on_pressure),
            progress_interval: self.progress_interval,
        }
    }

    fn process_one(&self, id: ParticipantId, path: &std::path::Path) -> FeatureRecord {
        process_one(&self.pipeline, id, path)
    }

    fn after_item(&self, finished: usize, total: usize, started: Instant) {
        after_item(self.progress_interval, finished, total, started);
    }
}

/// The per-thread view of a runner.
struct BatchWorker<T: AcousticToolkit> {
    pipeline: Arc<FeatureExtractionPipeline<T>>,
    memory: Arc<MemoryMonitor>,
    on_pressure: Arc<PressureCallback>,
    progress_interval: usize,
}

impl<T: AcousticToolkit> BatchWorker<T> {
    fn process_one(&self, id: ParticipantId, path: &std::path::Path) -> FeatureRecord {
        process_one(&self.pipeline, id, path)
    }

    fn after_item(&self, finished: usize, total: usize, started: Instant) {
        after_item(self.progress_interval, finished, total, started);
    }
}

fn process_one<T: AcousticToolkit>(
    pipeline: &FeatureExtractionPipeline<T>,
    id: ParticipantId,
    path: &std::path::Path,
) -> FeatureRecord {
    // Last-resort backstop; the pipeline itself should never panic.
    match catch_unwind(AssertUnwindSafe(|| pipeline.extract_file(path, id))) {
        Ok(record) => record,
        Err(_) => {
            tracing::error!(
                participant = id,
                path = %path.display(),
                "extraction panicked, emitting empty record"
            );
            FeatureRecord::all_missing(id)
        }
    }
}

/// Add an all-missing record for every work item with no row in the table.
fn backfill_missing_rows(table: &mut FeatureTable, items: &[WorkItem]) {
    let present: std::collections::BTreeSet<ParticipantId> =
        table.records().iter().map(|r| r.id).collect();
    for (id, path) in items {
        if !present.contains(id) {
            tracing::error!(
                participant = id,
                path = %path.display(),
                "no record for item, emitting empty record"
            );
            table.push(FeatureRecord::all_missing(*id));
        }
    }
}

fn check_memory(memory: &MemoryMonitor, on_pressure: &PressureCallback) {
    if let Some(usage) = memory.check() {
        on_pressure(usage);
    }
}

fn after_item(progress_interval: usize, finished: usize, total: usize, started: Instant) {
    if finished % progress_interval == 0 || finished == total {
        let elapsed = started.elapsed().as_secs_f64();
        let per_file = elapsed / finished as f64;
        let remaining = per_file * (total - finished) as f64;
        tracing::info!(
            finished,
            total,
            avg_s_per_file = format!("{per_file:.2}"),
            eta_s = format!("{remaining:.0}"),
            "batch progress"
        );
    }
}
