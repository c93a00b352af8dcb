use std::sync::{Arc, Mutex};

use vexec_core::{DenseMatrix, VexecError};

use crate::vectorized::batch::CpuBatchExecutor;
use crate::vectorized::context::ExecContext;
use crate::vectorized::pipeline::{PipelineBinding, PipelineDescriptor};
use crate::vectorized::pipeline_task::{CompiledPipelineTask, TaskRange};
use crate::vectorized::policy::{VectorCombine, VectorSplit};
use crate::vectorized::result::SharedResult;
use crate::vectorized::task::{Task, TaskKind};

/// Matrix whose row `i` is `[i, i, ...]`.
fn row_index_matrix(rows: usize, cols: usize) -> DenseMatrix<f64> {
    let values = (0..rows)
        .flat_map(|r| std::iter::repeat(r as f64).take(cols))
        .collect();
    DenseMatrix::from_vec(rows, cols, values).unwrap()
}

fn identity_descriptor(combine: VectorCombine, rows: usize, cols: usize) -> PipelineDescriptor<f64> {
    let exec = CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
        outputs[0] = Some(DenseMatrix::from_vec(
            inputs[0].num_rows(),
            inputs[0].num_cols(),
            inputs[0].to_vec(),
        )?);
        Ok(())
    });
    PipelineDescriptor::new(exec)
        .input(VectorSplit::Rows)
        .output(combine, rows, cols)
}

fn bind(
    descriptor: PipelineDescriptor<f64>,
    inputs: Vec<DenseMatrix<f64>>,
) -> (PipelineBinding<f64>, SharedResult<f64>) {
    let result = SharedResult::new(descriptor.num_outputs());
    let binding = PipelineBinding::new(
        Arc::new(descriptor),
        inputs,
        result.clone(),
        ExecContext::default(),
    )
    .unwrap();
    (binding, result)
}

#[test]
fn task_range_validation() {
    assert!(TaskRange::new(5, 4, 1, 0).is_err());
    assert!(TaskRange::new(0, 4, 0, 0).is_err());
    let range = TaskRange::new(3, 3, 2, 0).unwrap();
    assert!(range.is_empty());
    assert_eq!(range.batches().count(), 0);
}

#[test]
fn batches_cover_range_without_exceeding_bsize() {
    let range = TaskRange::new(2, 13, 4, 0).unwrap();
    let batches: Vec<_> = range.batches().collect();
    assert_eq!(batches, vec![(2, 6), (6, 10), (10, 13)]);
}

#[test]
fn row_split_input_is_sliced() {
    let (binding, _) = bind(
        identity_descriptor(VectorCombine::Rows, 10, 2),
        vec![row_index_matrix(10, 2)],
    );
    let task = CompiledPipelineTask::new(binding.clone(), TaskRange::new(0, 10, 5, 0).unwrap());
    let views = task.create_func_inputs(5, 8).unwrap();
    assert_eq!(views[0].shape(), (3, 2));
    assert_eq!(views[0].get(0, 0), Some(5.0));
    assert!(views[0].shares_buffer_with(&binding.inputs()[0]));
}

#[test]
fn single_row_input_is_broadcast_despite_row_split() {
    let (binding, _) = bind(
        identity_descriptor(VectorCombine::Add, 1, 4),
        vec![DenseMatrix::from_vec(1, 4, vec![1.0, 2.0, 3.0, 4.0]).unwrap()],
    );
    let task = CompiledPipelineTask::new(binding, TaskRange::new(0, 100, 10, 0).unwrap());
    let views = task.create_func_inputs(40, 50).unwrap();
    assert_eq!(views[0].shape(), (1, 4));
    assert_eq!(views[0].to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn whole_input_is_not_sliced() {
    let exec = CpuBatchExecutor::<f64>::shared(|_inputs, _outputs, _ctx| Ok(()));
    let descriptor = PipelineDescriptor::<f64>::new(exec)
        .input(VectorSplit::None)
        .output(VectorCombine::Add, 1, 1);
    let (binding, _) = bind(descriptor, vec![row_index_matrix(6, 3)]);
    let task = CompiledPipelineTask::new(binding, TaskRange::new(0, 6, 2, 0).unwrap());
    let views = task.create_func_inputs(2, 4).unwrap();
    assert_eq!(views[0].shape(), (6, 3));
}

#[test]
fn row_split_beyond_input_is_shape_error() {
    let (binding, _) = bind(
        identity_descriptor(VectorCombine::Rows, 10, 2),
        vec![row_index_matrix(4, 2)],
    );
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 10, 5, 0).unwrap());
    let err = task.execute().unwrap_err();
    assert!(matches!(err, VexecError::Shape(_)));
}

#[test]
fn place_rows_at_task_offset() {
    let (binding, result) = bind(
        identity_descriptor(VectorCombine::Rows, 10, 2),
        vec![row_index_matrix(10, 2)],
    );
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(4, 8, 3, 4).unwrap());
    task.execute().unwrap();
    assert_eq!(task.batches_executed(), 2);

    let res = result.get(0).unwrap().unwrap();
    assert_eq!(res.shape(), (10, 2));
    for r in 0..10 {
        let expected = if (4..8).contains(&r) { r as f64 } else { 0.0 };
        assert_eq!(res.get(r, 0), Some(expected), "row {}", r);
    }
}

#[test]
fn place_columns_at_task_offset() {
    // Each batch emits its rows transposed into a 1 x batch_rows output.
    let exec = CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
        let col: Vec<f64> = inputs[0].rows_iter().map(|row| row[0]).collect();
        outputs[0] = Some(DenseMatrix::from_vec(1, col.len(), col)?);
        Ok(())
    });
    let descriptor = PipelineDescriptor::new(exec)
        .input(VectorSplit::Rows)
        .output(VectorCombine::Cols, 1, 6);
    let (binding, result) = bind(descriptor, vec![row_index_matrix(6, 1)]);
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 6, 4, 0).unwrap());
    task.execute().unwrap();
    assert_eq!(result.get(0).unwrap().unwrap().to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn accumulate_sums_every_batch() {
    // Column sums: every batch contributes a 1 x cols partial sum.
    let exec = CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
        let mut acc = DenseMatrix::zeros(1, inputs[0].num_cols())?;
        for r in 0..inputs[0].num_rows() {
            acc.add_assign(&inputs[0].slice_rows(r, r + 1)?)?;
        }
        outputs[0] = Some(acc);
        Ok(())
    });
    let descriptor = PipelineDescriptor::new(exec)
        .input(VectorSplit::Rows)
        .output(VectorCombine::Add, 1, 2);
    let (binding, result) = bind(descriptor, vec![row_index_matrix(10, 2)]);
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 10, 3, 0).unwrap());
    task.execute().unwrap();
    assert_eq!(task.batches_executed(), 4);
    assert_eq!(result.get(0).unwrap().unwrap().to_vec(), vec![45.0, 45.0]);
    assert_eq!(result.allocations().unwrap(), 1);
}

#[test]
fn wrong_placement_height_is_shape_error() {
    let exec = CpuBatchExecutor::<f64>::shared(|_inputs, outputs, _ctx| {
        outputs[0] = Some(DenseMatrix::zeros(1, 2)?);
        Ok(())
    });
    let descriptor = PipelineDescriptor::new(exec)
        .input(VectorSplit::Rows)
        .output(VectorCombine::Rows, 10, 2);
    let (binding, _) = bind(descriptor, vec![row_index_matrix(10, 2)]);
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 10, 5, 0).unwrap());
    assert!(matches!(task.execute().unwrap_err(), VexecError::Shape(_)));
}

#[test]
fn failure_keeps_earlier_batches_without_committing_failed_one() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_fn = Arc::clone(&seen);
    let exec = CpuBatchExecutor::<f64>::shared(move |inputs, outputs, _ctx| {
        let first = inputs[0].get(0, 0).unwrap_or_default();
        seen_in_fn.lock().unwrap().push(first);
        if first >= 4.0 {
            return Err(VexecError::Compute("overflow in batch".into()));
        }
        outputs[0] = Some(DenseMatrix::filled(1, 1, 1.0)?);
        Ok(())
    });
    let descriptor = PipelineDescriptor::new(exec)
        .input(VectorSplit::Rows)
        .output(VectorCombine::Add, 1, 1);
    let (binding, result) = bind(descriptor, vec![row_index_matrix(8, 1)]);
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 8, 2, 0).unwrap());

    let err = task.execute().unwrap_err();
    assert!(matches!(err, VexecError::Compute(_)));
    // Batches [0,2) and [2,4) merged; [4,6) failed; [6,8) never ran.
    assert_eq!(*seen.lock().unwrap(), vec![0.0, 2.0, 4.0]);
    assert_eq!(task.batches_executed(), 2);
    assert_eq!(result.get(0).unwrap().unwrap().to_vec(), vec![2.0]);
}

/// `out0` accumulates 1.0 per batch, `out1` places the batch rows; batches
/// starting at or after `bad_from` emit a single row for `out1`.
fn count_and_place(bad_from: f64) -> PipelineDescriptor<f64> {
    let exec = CpuBatchExecutor::<f64>::shared(move |inputs, outputs, _ctx| {
        outputs[0] = Some(DenseMatrix::filled(1, 1, 1.0)?);
        let rows = if inputs[0].get(0, 0).unwrap_or_default() >= bad_from {
            1
        } else {
            inputs[0].num_rows()
        };
        outputs[1] = Some(inputs[0].slice_rows(0, rows)?);
        Ok(())
    });
    PipelineDescriptor::new(exec)
        .input(VectorSplit::Rows)
        .output(VectorCombine::Add, 1, 1)
        .output(VectorCombine::Rows, 4, 1)
}

#[test]
fn combiner_failure_on_later_output_commits_nothing_of_that_batch() {
    let (binding, result) = bind(count_and_place(2.0), vec![row_index_matrix(4, 1)]);
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 4, 2, 0).unwrap());

    let err = task.execute().unwrap_err();
    assert!(matches!(err, VexecError::Shape(_)));
    assert_eq!(task.batches_executed(), 1);
    // Only batch [0,2) is merged, for both outputs.
    assert_eq!(result.get(0).unwrap().unwrap().to_vec(), vec![1.0]);
    assert_eq!(result.get(1).unwrap().unwrap().to_vec(), vec![0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn placement_past_result_end_commits_nothing() {
    let (binding, result) = bind(count_and_place(f64::MAX), vec![row_index_matrix(4, 1)]);
    // Offset 3 puts the second row of the batch outside the 4-row result.
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(0, 2, 2, 3).unwrap());

    let err = task.execute().unwrap_err();
    assert!(matches!(err, VexecError::Shape(_)));
    assert_eq!(task.batches_executed(), 0);
    assert!(result.get(0).unwrap().is_none());
    assert!(result.get(1).unwrap().is_none());
}

#[test]
fn empty_range_touches_nothing() {
    let (binding, result) = bind(
        identity_descriptor(VectorCombine::Rows, 4, 2),
        vec![row_index_matrix(4, 2)],
    );
    let mut task = CompiledPipelineTask::new(binding, TaskRange::new(2, 2, 1, 2).unwrap());
    task.execute().unwrap();
    assert_eq!(task.batches_executed(), 0);
    assert!(result.get(0).unwrap().is_none());
}

#[test]
fn task_kind_follows_executor() {
    let (binding, _) = bind(
        identity_descriptor(VectorCombine::Rows, 4, 2),
        vec![row_index_matrix(4, 2)],
    );
    let task = CompiledPipelineTask::new(binding, TaskRange::new(0, 4, 1, 0).unwrap());
    assert_eq!(task.kind(), TaskKind::CompiledPipeline);
}

#[test]
fn binding_rejects_input_count_mismatch() {
    let descriptor = identity_descriptor(VectorCombine::Rows, 4, 2);
    let result = SharedResult::new(1);
    let err = PipelineBinding::new(Arc::new(descriptor), vec![], result, ExecContext::default());
    assert!(matches!(err, Err(VexecError::Shape(_))));
}
