use std::sync::Arc;

use vexec_core::{DenseMatrix, Element, Result, VexecError};

use super::context::ExecContext;
use super::task::TaskKind;

/// Compiled host-side body of a pipeline: reads the batch views and fills
/// one slot per output.
pub type PipelineFn<VT> = Arc<
    dyn Fn(&[DenseMatrix<VT>], &mut [Option<DenseMatrix<VT>>], &ExecContext) -> Result<()>
        + Send
        + Sync,
>;

/// Strategy that turns one batch of input views into host-visible batch outputs.
///
/// Shared by every task of a pipeline invocation, so implementations must not
/// hold per-batch state.
pub trait BatchExecutor<VT: Element>: Send + Sync {
    /// Task kind reported by tasks using this executor.
    fn kind(&self) -> TaskKind;

    /// Execute one batch and return exactly `num_outputs` local outputs.
    fn run_batch(
        &self,
        inputs: &[DenseMatrix<VT>],
        num_outputs: usize,
        ctx: &ExecContext,
    ) -> Result<Vec<DenseMatrix<VT>>>;
}

/// Runs the compiled function directly on host views.
pub struct CpuBatchExecutor<VT: Element> {
    func: PipelineFn<VT>,
}

impl<VT: Element> CpuBatchExecutor<VT> {
    pub fn new(func: PipelineFn<VT>) -> Self {
        Self { func }
    }

    /// Wrap a closure as a shared executor handle.
    pub fn shared<F>(func: F) -> Arc<dyn BatchExecutor<VT>>
    where
        F: Fn(&[DenseMatrix<VT>], &mut [Option<DenseMatrix<VT>>], &ExecContext) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self::new(Arc::new(func)))
    }
}

impl<VT: Element> BatchExecutor<VT> for CpuBatchExecutor<VT> {
    fn kind(&self) -> TaskKind {
        TaskKind::CompiledPipeline
    }

    fn run_batch(
        &self,
        inputs: &[DenseMatrix<VT>],
        num_outputs: usize,
        ctx: &ExecContext,
    ) -> Result<Vec<DenseMatrix<VT>>> {
        let mut outputs = vec![None; num_outputs];
        (self.func)(inputs, &mut outputs, ctx)?;
        collect_outputs(outputs)
    }
}

/// Unwrap filled output slots; an empty slot means the compiled function broke its contract.
pub(crate) fn collect_outputs<T>(outputs: Vec<Option<T>>) -> Result<Vec<T>> {
    outputs
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| {
                VexecError::Compute(format!("compiled function did not produce output {}", i))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_executor_runs_closure() {
        let exec = CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
            let mut out = inputs[0].clone();
            out.add_assign(&inputs[0])?;
            outputs[0] = Some(out);
            Ok(())
        });
        let input = DenseMatrix::filled(2, 2, 1.5).unwrap();
        let out = exec
            .run_batch(&[input], 1, &ExecContext::default())
            .unwrap();
        assert_eq!(out[0].to_vec(), vec![3.0; 4]);
        assert_eq!(exec.kind(), TaskKind::CompiledPipeline);
    }

    #[test]
    fn missing_output_is_compute_error() {
        let exec = CpuBatchExecutor::<f64>::shared(|_inputs, _outputs, _ctx| Ok(()));
        let err = exec
            .run_batch(&[], 1, &ExecContext::default())
            .unwrap_err();
        assert!(matches!(err, VexecError::Compute(_)));
    }

    #[test]
    fn function_error_propagates() {
        let exec = CpuBatchExecutor::<f64>::shared(|_inputs, _outputs, _ctx| {
            Err(VexecError::Compute("division by zero".into()))
        });
        let err = exec
            .run_batch(&[], 1, &ExecContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }
}
