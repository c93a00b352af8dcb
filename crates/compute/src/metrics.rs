use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Executor operational metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutorMetrics {
    /// Pipeline invocations completed (successfully or not).
    pub pipelines_executed: u64,
    /// Total tasks executed by task kind.
    pub tasks_executed: HashMap<String, u64>,
    /// Total tasks that returned an error, by task kind.
    pub tasks_failed: HashMap<String, u64>,
    /// Total batches processed across all tasks.
    pub batches_executed: u64,
    /// Average task duration by task kind.
    pub avg_task_duration: HashMap<String, Duration>,
    /// Last execution time by task kind.
    pub last_run: HashMap<String, DateTime<Utc>>,
}

impl ExecutorMetrics {
    /// Record a successful task execution.
    pub fn record_execution(&mut self, kind: &str, duration: Duration, batches: usize) {
        *self.tasks_executed.entry(kind.to_string()).or_default() += 1;
        self.batches_executed += batches as u64;
        self.last_run.insert(kind.to_string(), Utc::now());

        let count = self.tasks_executed[kind];
        let prev_avg = self
            .avg_task_duration
            .get(kind)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };

        self.avg_task_duration.insert(kind.to_string(), new_avg);
    }

    /// Record a failed task. Batches merged before the failure still count.
    pub fn record_failure(&mut self, kind: &str, batches: usize) {
        *self.tasks_failed.entry(kind.to_string()).or_default() += 1;
        self.batches_executed += batches as u64;
    }

    pub fn total_tasks(&self) -> u64 {
        self.tasks_executed.values().sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.tasks_failed.values().sum()
    }
}
