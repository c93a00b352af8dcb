//! Vectorized pipeline tasks: the units a worker executes to run a compiled
//! pipeline over a row range and merge the partial outputs into one shared
//! result.
//!
//! - `task`: the [`Task`] work-unit trait and the [`EofTask`] shutdown sentinel
//! - `policy`: per-input split and per-output combine policies
//! - `pipeline`: compiled pipeline descriptor and per-invocation binding
//! - `batch`: the [`BatchExecutor`] strategy (host path lives here, the
//!   accelerated path in [`crate::accel`])
//! - `pipeline_task`: [`CompiledPipelineTask`], the row-range driver
//! - `result`: the lazily allocated [`SharedResult`]

pub mod batch;
pub mod context;
pub mod pipeline;
pub mod pipeline_task;
pub mod policy;
pub mod result;
pub mod task;

pub use batch::{BatchExecutor, CpuBatchExecutor, PipelineFn};
pub use context::ExecContext;
pub use pipeline::{PipelineBinding, PipelineDescriptor};
pub use pipeline_task::{CompiledPipelineTask, TaskRange};
pub use policy::{VectorCombine, VectorSplit};
pub use result::{ResultSlots, SharedResult};
pub use task::{EofTask, Task, TaskKind};
