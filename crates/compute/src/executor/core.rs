use std::sync::{Arc, RwLock};

use tracing::info;
use vexec_core::{ExecutorConfig, Result, VexecError};

use crate::metrics::ExecutorMetrics;

/// Runs compiled pipelines by partitioning their rows across a pool of
/// workers, each draining its own sentinel-terminated task queue.
pub struct VectorizedExecutor {
    pub(super) config: ExecutorConfig,
    pub(super) pool: rayon::ThreadPool,
    pub(super) metrics: Arc<RwLock<ExecutorMetrics>>,
}

impl VectorizedExecutor {
    /// Create an executor with its own worker thread pool.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        let num_workers = config.resolved_worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("vexec-worker-{}", i))
            .build()
            .map_err(|e| VexecError::Allocation(format!("worker pool: {}", e)))?;
        info!(
            workers = num_workers,
            batch_size = config.batch_size,
            device = %config.device,
            "vectorized executor ready"
        );
        Ok(Self {
            config,
            pool,
            metrics: Arc::new(RwLock::new(ExecutorMetrics::default())),
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn num_workers(&self) -> usize {
        self.config.resolved_worker_threads()
    }

    /// Get a snapshot of the current executor metrics.
    pub fn metrics(&self) -> Result<ExecutorMetrics> {
        self.metrics
            .read()
            .map(|m| m.clone())
            .map_err(|e| VexecError::LockPoisoned(format!("executor metrics: {}", e)))
    }

    /// Get an Arc to the metrics (for external reads without cloning).
    pub fn metrics_handle(&self) -> Arc<RwLock<ExecutorMetrics>> {
        Arc::clone(&self.metrics)
    }
}
