pub mod accel;
pub mod executor;
pub mod kernels;
pub mod metrics;
pub mod vectorized;
pub mod worker;

pub use accel::{Activation, DeviceBackend, DeviceBatchExecutor, DeviceBuffer, HostEmulatedDevice};
pub use executor::VectorizedExecutor;
pub use metrics::ExecutorMetrics;
pub use vectorized::{
    BatchExecutor, CompiledPipelineTask, CpuBatchExecutor, EofTask, ExecContext, PipelineBinding,
    PipelineDescriptor, SharedResult, Task, TaskKind, TaskRange, VectorCombine, VectorSplit,
};
pub use worker::{Worker, WorkerReport, task_queue};
