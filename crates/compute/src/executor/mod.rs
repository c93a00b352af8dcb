//! Reference scheduler for vectorized pipelines.
//!
//! Split into focused submodules:
//! - `core`: executor struct, constructor, and accessor methods
//! - `partition`: row-range partitioning of a pipeline invocation
//! - `execution`: task construction, worker queues, and joining

mod core;
mod execution;
pub mod partition;

pub use self::core::VectorizedExecutor;
pub use partition::{partition_rows, total_rows};
