//! Worker queues and the sentinel-terminated consumption loop.

pub mod consumer;
pub mod queue;

pub use consumer::{Worker, WorkerReport};
pub use queue::{BoxedTask, TaskReceiver, TaskSender, task_queue};
