//! Host kernels used by compiled pipeline bodies on the CPU path.
//!
//! The slice-level loops are shared with the device kernels in
//! [`crate::accel::kernels`], so both paths compute identical values.

use vexec_core::{DenseMatrix, Element, Result, VexecError};

/// `out[r, c] = a[r, c] + b[r, c]`, or `b[0, c]` when `b` is a broadcast row.
pub(crate) fn add_into<VT: Element>(out: &mut [VT], a: &[VT], b: &[VT], cols: usize, broadcast_b: bool) {
    if cols == 0 {
        return;
    }
    for ((dst_row, a_row), r) in out.chunks_mut(cols).zip(a.chunks(cols)).zip(0..) {
        let b_row = if broadcast_b { &b[..cols] } else { &b[r * cols..(r + 1) * cols] };
        for ((dst, x), y) in dst_row.iter_mut().zip(a_row).zip(b_row) {
            let mut v = *x;
            v += *y;
            *dst = v;
        }
    }
}

/// `out[i] = max(x[i], 0)`.
pub(crate) fn relu_into<VT: Element>(out: &mut [VT], x: &[VT]) {
    let zero = VT::default();
    for (dst, v) in out.iter_mut().zip(x) {
        *dst = if *v > zero { *v } else { zero };
    }
}

/// `out[c] = sum_r x[r, c]`.
pub(crate) fn col_sums_into<VT: Element>(out: &mut [VT], x: &[VT], cols: usize) {
    if cols == 0 {
        return;
    }
    for row in x.chunks(cols) {
        for (dst, v) in out.iter_mut().zip(row) {
            *dst += *v;
        }
    }
}

/// Check that `b` can be added to `a`; returns whether `b` is broadcast.
pub(crate) fn check_add_shapes(a: (usize, usize), b: (usize, usize)) -> Result<bool> {
    if a == b {
        return Ok(false);
    }
    if b.0 == 1 && b.1 == a.1 {
        return Ok(true);
    }
    Err(VexecError::Shape(format!(
        "cannot add {}x{} to {}x{}",
        b.0, b.1, a.0, a.1
    )))
}

/// Elementwise sum, broadcasting `b` when it is a single row.
pub fn ewise_add<VT: Element>(a: &DenseMatrix<VT>, b: &DenseMatrix<VT>) -> Result<DenseMatrix<VT>> {
    let broadcast = check_add_shapes(a.shape(), b.shape())?;
    let (rows, cols) = a.shape();
    let mut out = vec![VT::default(); rows * cols];
    add_into(&mut out, &a.to_vec(), &b.to_vec(), cols, broadcast);
    DenseMatrix::from_vec(rows, cols, out)
}

/// Rectified linear unit, `max(x, 0)` per element.
pub fn relu_forward<VT: Element>(x: &DenseMatrix<VT>) -> Result<DenseMatrix<VT>> {
    let (rows, cols) = x.shape();
    let mut out = vec![VT::default(); rows * cols];
    relu_into(&mut out, &x.to_vec());
    DenseMatrix::from_vec(rows, cols, out)
}

/// Column sums as a `1 x cols` matrix.
pub fn col_sums<VT: Element>(x: &DenseMatrix<VT>) -> Result<DenseMatrix<VT>> {
    let cols = x.num_cols();
    let mut out = vec![VT::default(); cols];
    col_sums_into(&mut out, &x.to_vec(), cols);
    DenseMatrix::from_vec(1, cols, out)
}
