use std::ops::Range;

use vexec_core::{DenseMatrix, Element, Result, VexecError};

use crate::vectorized::pipeline::PipelineDescriptor;
use crate::vectorized::policy::VectorSplit;

/// Split `[0, total)` into at most `parts` contiguous, non-empty ranges whose
/// lengths differ by at most one.
pub fn partition_rows(total: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1).min(total);
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let extra = total % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Number of rows a pipeline invocation iterates over.
///
/// Taken from the row-split inputs with more than one row, which must agree.
/// When every row-split input is a single row (or there is none), the
/// pipeline runs as one row.
pub fn total_rows<VT: Element>(
    descriptor: &PipelineDescriptor<VT>,
    inputs: &[DenseMatrix<VT>],
) -> Result<usize> {
    let mut total: Option<(usize, usize)> = None;
    for (i, (input, split)) in inputs.iter().zip(descriptor.splits()).enumerate() {
        if *split != VectorSplit::Rows || input.num_rows() == 1 {
            continue;
        }
        match total {
            None => total = Some((i, input.num_rows())),
            Some((first, rows)) if rows != input.num_rows() => {
                return Err(VexecError::Shape(format!(
                    "row-split inputs disagree: input {} has {} rows, input {} has {}",
                    first,
                    rows,
                    i,
                    input.num_rows()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(total.map(|(_, rows)| rows).unwrap_or(1))
}
