use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{info, warn};
use vexec_core::{DenseMatrix, Element, Result, VexecError};

use crate::vectorized::context::ExecContext;
use crate::vectorized::pipeline::{PipelineBinding, PipelineDescriptor};
use crate::vectorized::pipeline_task::{CompiledPipelineTask, TaskRange};
use crate::vectorized::result::SharedResult;
use crate::worker::{TaskReceiver, Worker, WorkerReport, task_queue};

use super::VectorizedExecutor;
use super::partition::{partition_rows, total_rows};

impl VectorizedExecutor {
    /// Run a compiled pipeline over `inputs` and return one matrix per output.
    ///
    /// The rows are split into one contiguous range per worker; each range
    /// becomes a task placed at its own row offset. Every worker queue is
    /// closed with exactly one sentinel before the workers start. If any task
    /// fails, the first error in worker order is returned after all workers
    /// have joined; sibling tasks are not cancelled.
    pub fn execute<VT: Element>(
        &self,
        descriptor: &Arc<PipelineDescriptor<VT>>,
        inputs: Vec<DenseMatrix<VT>>,
    ) -> Result<Vec<DenseMatrix<VT>>> {
        let start = Instant::now();
        let ctx = ExecContext::new(self.config.clone());
        let invocation = ctx.invocation_id();
        let total = total_rows(descriptor, &inputs)?;
        let result = SharedResult::new(descriptor.num_outputs());
        let binding = PipelineBinding::new(Arc::clone(descriptor), inputs, result.clone(), ctx)?;

        let num_workers = self.num_workers();
        let ranges = partition_rows(total, num_workers);
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..num_workers).map(|_| task_queue()).unzip();
        for (i, range) in ranges.iter().enumerate() {
            let task_range = TaskRange::new(range.start, range.end, self.config.batch_size, range.start)?;
            let task = CompiledPipelineTask::new(binding.clone(), task_range);
            senders[i % num_workers].push(Box::new(task))?;
        }
        for sender in senders {
            sender.close()?;
        }
        drop(binding);

        let reports = self.run_workers(receivers)?;
        if let Ok(mut m) = self.metrics.write() {
            m.pipelines_executed += 1;
        }

        let failed: usize = reports.iter().map(|r| r.tasks_failed).sum();
        let first_error = reports.into_iter().flat_map(|r| r.errors).next();
        if let Some(err) = first_error {
            warn!(
                invocation = %invocation,
                failed_tasks = failed,
                error = %err,
                "pipeline invocation failed"
            );
            return Err(err);
        }

        let outputs = result
            .take_outputs()?
            .into_iter()
            .enumerate()
            .map(|(o, slot)| match slot {
                Some(m) => Ok(m),
                None => DenseMatrix::zeros(descriptor.out_rows()[o], descriptor.out_cols()[o]),
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            invocation = %invocation,
            kind = descriptor.kind().as_str(),
            rows = total,
            tasks = ranges.len(),
            workers = num_workers,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline invocation complete"
        );
        Ok(outputs)
    }

    /// Run one worker loop per queue on the pool and wait for all of them.
    pub(crate) fn run_workers(&self, receivers: Vec<TaskReceiver>) -> Result<Vec<WorkerReport>> {
        let reports = Mutex::new(Vec::with_capacity(receivers.len()));
        self.pool.scope(|s| {
            for (id, queue) in receivers.into_iter().enumerate() {
                let reports = &reports;
                let metrics = Arc::clone(&self.metrics);
                s.spawn(move |_| {
                    let report = Worker::new(id, queue).with_metrics(metrics).run();
                    match reports.lock() {
                        Ok(mut r) => r.push(report),
                        Err(poisoned) => poisoned.into_inner().push(report),
                    }
                });
            }
        });
        let mut reports = reports
            .into_inner()
            .map_err(|e| VexecError::LockPoisoned(format!("worker reports: {}", e)))?;
        reports.sort_by_key(|r| r.worker_id);
        Ok(reports)
    }
}
