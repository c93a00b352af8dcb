use vexec_core::Result;

/// Discriminates queued work units. Workers only care whether a unit is the
/// shutdown sentinel; every other kind is executed the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum TaskKind {
    Eof,
    CompiledPipeline,
    CompiledPipelineAccelerated,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Eof => "eof",
            TaskKind::CompiledPipeline => "compiled_pipeline",
            TaskKind::CompiledPipelineAccelerated => "compiled_pipeline_accelerated",
        }
    }
}

/// A unit of work a worker pulls from its queue.
///
/// Consumed exactly once: the worker calls [`Task::execute`] and drops the
/// unit afterwards.
pub trait Task: Send {
    fn kind(&self) -> TaskKind;

    /// Run the unit to completion.
    fn execute(&mut self) -> Result<()>;

    /// Batches processed so far, for units that iterate in batches.
    fn batches_executed(&self) -> usize {
        0
    }
}

/// Sentinel signalling that no further units will arrive on a queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct EofTask;

impl Task for EofTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Eof
    }

    fn execute(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_is_noop() {
        let mut eof = EofTask;
        assert_eq!(eof.kind(), TaskKind::Eof);
        assert!(eof.execute().is_ok());
    }

    #[test]
    fn kind_names() {
        assert_eq!(TaskKind::Eof.as_str(), "eof");
        assert_eq!(TaskKind::CompiledPipeline.as_str(), "compiled_pipeline");
    }
}
