use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, warn};
use vexec_core::VexecError;

use crate::metrics::ExecutorMetrics;
use crate::vectorized::task::TaskKind;

use super::queue::TaskReceiver;

/// Outcome of one worker's consumption loop.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub tasks_executed: usize,
    pub tasks_failed: usize,
    pub batches_executed: usize,
    /// Task failures in dequeue order. A failed task does not stop the worker.
    pub errors: Vec<VexecError>,
}

impl WorkerReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Consumes one task queue until its shutdown sentinel.
pub struct Worker {
    id: usize,
    queue: TaskReceiver,
    metrics: Option<Arc<RwLock<ExecutorMetrics>>>,
}

impl Worker {
    pub fn new(id: usize, queue: TaskReceiver) -> Self {
        Self {
            id,
            queue,
            metrics: None,
        }
    }

    /// Record task executions into shared metrics.
    pub fn with_metrics(mut self, metrics: Arc<RwLock<ExecutorMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Pull and execute units until the sentinel is dequeued.
    ///
    /// The sentinel itself is not executed. Task errors and panics are
    /// collected into the report; the loop only ends early when the queue is
    /// disconnected.
    pub fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker_id: self.id,
            ..Default::default()
        };

        loop {
            let mut task = match self.queue.recv() {
                Ok(task) => task,
                Err(e) => {
                    warn!(worker = self.id, error = %e, "worker queue failed");
                    report.errors.push(e);
                    break;
                }
            };
            let kind = task.kind();
            if kind == TaskKind::Eof {
                break;
            }

            let start = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.execute()))
                .unwrap_or_else(|payload| Err(VexecError::WorkerPanicked(panic_message(payload.as_ref()))));
            let duration = start.elapsed();
            let batches = task.batches_executed();
            report.batches_executed += batches;

            match outcome {
                Ok(()) => {
                    report.tasks_executed += 1;
                    self.record(|m| m.record_execution(kind.as_str(), duration, batches));
                }
                Err(e) => {
                    warn!(worker = self.id, kind = kind.as_str(), error = %e, "task failed");
                    report.tasks_failed += 1;
                    self.record(|m| m.record_failure(kind.as_str(), batches));
                    report.errors.push(e);
                }
            }
        }

        debug!(
            worker = self.id,
            executed = report.tasks_executed,
            failed = report.tasks_failed,
            "worker finished"
        );
        report
    }

    /// Apply `f` to the shared metrics, if attached.
    fn record(&self, f: impl FnOnce(&mut ExecutorMetrics)) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        match metrics.write() {
            Ok(mut m) => f(&mut m),
            Err(e) => warn!(worker = self.id, error = %e, "metrics lock poisoned, sample dropped"),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
