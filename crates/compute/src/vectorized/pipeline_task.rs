use std::time::Instant;

use tracing::debug;
use vexec_core::{DenseMatrix, Element, Result, VexecError};

use super::pipeline::PipelineBinding;
use super::policy::{VectorCombine, VectorSplit};
use super::task::{Task, TaskKind};

/// Row range assigned to one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRange {
    /// Row lower index (inclusive).
    rl: usize,
    /// Row upper index (exclusive).
    ru: usize,
    /// Rows per batch.
    bsize: usize,
    /// Row (or column) offset of `rl` inside the shared result when placing.
    offset: usize,
}

impl TaskRange {
    pub fn new(rl: usize, ru: usize, bsize: usize, offset: usize) -> Result<Self> {
        if rl > ru {
            return Err(VexecError::Shape(format!("invalid row range [{}, {})", rl, ru)));
        }
        if bsize == 0 {
            return Err(VexecError::Shape("batch size must be greater than 0".into()));
        }
        Ok(Self { rl, ru, bsize, offset })
    }

    pub fn rl(&self) -> usize {
        self.rl
    }

    pub fn ru(&self) -> usize {
        self.ru
    }

    pub fn bsize(&self) -> usize {
        self.bsize
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Batch boundaries `[r, r2)` in increasing row order.
    pub fn batches(&self) -> impl Iterator<Item = (usize, usize)> {
        let (ru, bsize) = (self.ru, self.bsize);
        (self.rl..self.ru)
            .step_by(bsize)
            .map(move |r| (r, (r + bsize).min(ru)))
    }

    pub fn len(&self) -> usize {
        self.ru - self.rl
    }

    pub fn is_empty(&self) -> bool {
        self.rl == self.ru
    }
}

/// Executes a compiled pipeline over one row range, batch by batch, merging
/// each batch's outputs into the shared result.
///
/// Whether batches run on the host or an accelerator is decided by the
/// binding's [`BatchExecutor`](super::batch::BatchExecutor); row iteration,
/// input partitioning and output combination are identical for both.
pub struct CompiledPipelineTask<VT: Element> {
    binding: PipelineBinding<VT>,
    range: TaskRange,
    batches_executed: usize,
}

impl<VT: Element> CompiledPipelineTask<VT> {
    pub fn new(binding: PipelineBinding<VT>, range: TaskRange) -> Self {
        Self {
            binding,
            range,
            batches_executed: 0,
        }
    }

    pub fn range(&self) -> TaskRange {
        self.range
    }

    /// Build the input views for batch `[r, r2)`.
    ///
    /// Inputs declared whole, and any input with a single row, are passed
    /// unmodified (broadcast); all others become zero-copy row views.
    pub fn create_func_inputs(&self, r: usize, r2: usize) -> Result<Vec<DenseMatrix<VT>>> {
        let splits = self.binding.descriptor.splits();
        self.binding
            .inputs
            .iter()
            .zip(splits)
            .enumerate()
            .map(|(i, (input, split))| match split {
                VectorSplit::Rows if input.num_rows() != 1 => {
                    input.slice_rows(r, r2).map_err(|e| {
                        VexecError::Shape(format!("input {} for batch [{}, {}): {}", i, r, r2, e))
                    })
                }
                _ => Ok(input.clone()),
            })
            .collect()
    }

    /// Merge batch `[r, r2)` outputs into the shared result under its lock,
    /// allocating each result slot on first write.
    ///
    /// All outputs are shape-checked before the lock is taken and every
    /// missing slot is allocated before any slot is written, so a failing
    /// batch leaves the shared result untouched.
    pub fn accumulate_outputs(&self, local: Vec<DenseMatrix<VT>>, r: usize, r2: usize) -> Result<()> {
        let descriptor = &self.binding.descriptor;
        if local.len() != descriptor.num_outputs() {
            return Err(VexecError::Shape(format!(
                "batch produced {} outputs, pipeline declares {}",
                local.len(),
                descriptor.num_outputs()
            )));
        }
        let pos = self.range.offset + (r - self.range.rl);
        for (o, lres) in local.iter().enumerate() {
            self.check_output(o, lres, r, r2, pos)?;
        }

        self.binding.result.with_slots(|slots| {
            for o in 0..local.len() {
                slots.get_or_allocate(o, descriptor.out_rows()[o], descriptor.out_cols()[o])?;
            }
            for (o, lres) in local.iter().enumerate() {
                let res = slots.get_or_allocate(o, descriptor.out_rows()[o], descriptor.out_cols()[o])?;
                match descriptor.combines()[o] {
                    VectorCombine::Add => res.add_assign(lres)?,
                    VectorCombine::Rows => res.copy_rows_from(lres, pos)?,
                    VectorCombine::Cols => res.copy_cols_from(lres, pos)?,
                }
            }
            Ok(())
        })
    }

    /// Check that output `o` of batch `[r, r2)` fits its combine policy at `pos`.
    fn check_output(&self, o: usize, lres: &DenseMatrix<VT>, r: usize, r2: usize, pos: usize) -> Result<()> {
        let descriptor = &self.binding.descriptor;
        let (rows, cols) = (descriptor.out_rows()[o], descriptor.out_cols()[o]);
        let batch_rows = r2 - r;
        let (ok, expected) = match descriptor.combines()[o] {
            VectorCombine::Add => (lres.shape() == (rows, cols), (rows, cols)),
            VectorCombine::Rows => (
                lres.shape() == (batch_rows, cols) && pos + batch_rows <= rows,
                (batch_rows, cols),
            ),
            VectorCombine::Cols => (
                lres.shape() == (rows, batch_rows) && pos + batch_rows <= cols,
                (rows, batch_rows),
            ),
        };
        if ok {
            return Ok(());
        }
        Err(VexecError::Shape(format!(
            "output {}: batch [{}, {}) produced {}x{}, expected {}x{} at offset {} of a {}x{} result",
            o,
            r,
            r2,
            lres.num_rows(),
            lres.num_cols(),
            expected.0,
            expected.1,
            pos,
            rows,
            cols
        )))
    }
}

impl<VT: Element> Task for CompiledPipelineTask<VT> {
    fn kind(&self) -> TaskKind {
        self.binding.descriptor.kind()
    }

    fn execute(&mut self) -> Result<()> {
        let start = Instant::now();
        let num_outputs = self.binding.descriptor.num_outputs();
        let range = self.range;
        for (r, r2) in range.batches() {
            let outputs = {
                let inputs = self.create_func_inputs(r, r2)?;
                self.binding
                    .descriptor
                    .executor()
                    .run_batch(&inputs, num_outputs, &self.binding.ctx)?
            };
            self.accumulate_outputs(outputs, r, r2)?;
            self.batches_executed += 1;
        }
        debug!(
            invocation = %self.binding.ctx.invocation_id(),
            kind = self.kind().as_str(),
            rl = self.range.rl,
            ru = self.range.ru,
            batches = self.batches_executed,
            elapsed_us = start.elapsed().as_micros() as u64,
            "pipeline task done"
        );
        Ok(())
    }

    fn batches_executed(&self) -> usize {
        self.batches_executed
    }
}

#[cfg(test)]
mod tests;
