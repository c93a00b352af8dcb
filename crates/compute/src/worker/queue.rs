use std::sync::mpsc;

use vexec_core::{Result, VexecError};

use crate::vectorized::task::{EofTask, Task};

pub type BoxedTask = Box<dyn Task>;

/// Create an unbounded task queue for one worker.
pub fn task_queue() -> (TaskSender, TaskReceiver) {
    let (tx, rx) = mpsc::channel();
    (TaskSender { tx }, TaskReceiver { rx })
}

/// Producer side of a worker queue, held by the scheduler.
pub struct TaskSender {
    tx: mpsc::Sender<BoxedTask>,
}

impl TaskSender {
    /// Enqueue one unit of work.
    pub fn push(&self, task: BoxedTask) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|_| VexecError::QueueDisconnected("worker queue receiver dropped".into()))
    }

    /// Enqueue the shutdown sentinel. Consumes the sender, so each queue
    /// receives exactly one.
    pub fn close(self) -> Result<()> {
        self.push(Box::new(EofTask))
    }
}

/// Consumer side of a worker queue, owned by one worker.
pub struct TaskReceiver {
    rx: mpsc::Receiver<BoxedTask>,
}

impl TaskReceiver {
    /// Block until the next unit arrives.
    ///
    /// A queue whose sender is gone before the sentinel was enqueued would
    /// never terminate on its own, so that case is reported as an error.
    pub fn recv(&self) -> Result<BoxedTask> {
        self.rx.recv().map_err(|_| {
            VexecError::QueueDisconnected("worker queue closed without shutdown sentinel".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorized::task::TaskKind;

    #[test]
    fn close_enqueues_sentinel() {
        let (tx, rx) = task_queue();
        tx.close().unwrap();
        assert_eq!(rx.recv().unwrap().kind(), TaskKind::Eof);
    }

    #[test]
    fn dropped_sender_is_reported() {
        let (tx, rx) = task_queue();
        drop(tx);
        let err = rx.recv().err().unwrap();
        assert!(matches!(err, VexecError::QueueDisconnected(_)));
    }

    #[test]
    fn push_after_receiver_dropped_fails() {
        let (tx, rx) = task_queue();
        drop(rx);
        assert!(tx.push(Box::new(EofTask)).is_err());
    }
}
