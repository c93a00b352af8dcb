use std::sync::Arc;

use vexec_core::{DenseMatrix, Element, Result, VexecError};

use super::batch::BatchExecutor;
use super::context::ExecContext;
use super::policy::{VectorCombine, VectorSplit};
use super::result::SharedResult;
use super::task::TaskKind;

/// Compiled pipeline as handed over by the compiler: the batch body plus the
/// per-input split and per-output combine policies and declared output shapes.
pub struct PipelineDescriptor<VT: Element> {
    executor: Arc<dyn BatchExecutor<VT>>,
    splits: Vec<VectorSplit>,
    combines: Vec<VectorCombine>,
    out_rows: Vec<usize>,
    out_cols: Vec<usize>,
}

impl<VT: Element> PipelineDescriptor<VT> {
    pub fn new(executor: Arc<dyn BatchExecutor<VT>>) -> Self {
        Self {
            executor,
            splits: Vec::new(),
            combines: Vec::new(),
            out_rows: Vec::new(),
            out_cols: Vec::new(),
        }
    }

    /// Declare the next input and its split policy.
    pub fn input(mut self, split: VectorSplit) -> Self {
        self.splits.push(split);
        self
    }

    /// Declare the next output: combine policy and total result shape.
    pub fn output(mut self, combine: VectorCombine, rows: usize, cols: usize) -> Self {
        self.combines.push(combine);
        self.out_rows.push(rows);
        self.out_cols.push(cols);
        self
    }

    pub fn executor(&self) -> &Arc<dyn BatchExecutor<VT>> {
        &self.executor
    }

    pub fn kind(&self) -> TaskKind {
        self.executor.kind()
    }

    pub fn splits(&self) -> &[VectorSplit] {
        &self.splits
    }

    pub fn combines(&self) -> &[VectorCombine] {
        &self.combines
    }

    pub fn out_rows(&self) -> &[usize] {
        &self.out_rows
    }

    pub fn out_cols(&self) -> &[usize] {
        &self.out_cols
    }

    pub fn num_inputs(&self) -> usize {
        self.splits.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.combines.len()
    }
}

/// Everything the tasks of one pipeline invocation share: the compiled
/// pipeline, the read-only inputs, the result slots, and the context.
pub struct PipelineBinding<VT: Element> {
    pub(crate) descriptor: Arc<PipelineDescriptor<VT>>,
    pub(crate) inputs: Arc<[DenseMatrix<VT>]>,
    pub(crate) result: SharedResult<VT>,
    pub(crate) ctx: ExecContext,
}

impl<VT: Element> Clone for PipelineBinding<VT> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            inputs: Arc::clone(&self.inputs),
            result: self.result.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<VT: Element> PipelineBinding<VT> {
    pub fn new(
        descriptor: Arc<PipelineDescriptor<VT>>,
        inputs: Vec<DenseMatrix<VT>>,
        result: SharedResult<VT>,
        ctx: ExecContext,
    ) -> Result<Self> {
        if inputs.len() != descriptor.num_inputs() {
            return Err(VexecError::Shape(format!(
                "pipeline declares {} inputs, got {}",
                descriptor.num_inputs(),
                inputs.len()
            )));
        }
        let slots = result.with_slots(|slots| Ok(slots.len()))?;
        if slots != descriptor.num_outputs() {
            return Err(VexecError::Shape(format!(
                "pipeline declares {} outputs, result has {} slots",
                descriptor.num_outputs(),
                slots
            )));
        }
        Ok(Self {
            descriptor,
            inputs: inputs.into(),
            result,
            ctx,
        })
    }

    pub fn descriptor(&self) -> &PipelineDescriptor<VT> {
        &self.descriptor
    }

    pub fn inputs(&self) -> &[DenseMatrix<VT>] {
        &self.inputs
    }

    pub fn result(&self) -> &SharedResult<VT> {
        &self.result
    }

    pub fn context(&self) -> &ExecContext {
        &self.ctx
    }
}
