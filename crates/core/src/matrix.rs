use std::fmt::Debug;
use std::ops::AddAssign;
use std::sync::Arc;

use crate::error::{Result, VexecError};

/// Value type storable in a [`DenseMatrix`].
pub trait Element:
    Copy + Default + AddAssign + PartialEq + PartialOrd + Debug + Send + Sync + 'static
{
}

impl Element for f32 {}
impl Element for f64 {}
impl Element for i32 {}
impl Element for i64 {}
impl Element for u32 {}
impl Element for u64 {}

/// Row-major dense matrix over a reference-counted value buffer.
///
/// Row-range slices share the buffer with their parent, so creating a view
/// is O(1). Mutating methods copy the buffer first when it is shared
/// (`Arc::make_mut`), which keeps outstanding views unchanged.
#[derive(Clone)]
pub struct DenseMatrix<VT: Element> {
    values: Arc<Vec<VT>>,
    /// Index of element (0, 0) inside `values`.
    offset: usize,
    rows: usize,
    cols: usize,
    /// Distance between two consecutive rows inside `values`.
    row_skip: usize,
}

impl<VT: Element> DenseMatrix<VT> {
    /// Allocate a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::filled(rows, cols, VT::default())
    }

    /// Allocate a matrix filled with a single value, reporting a resource
    /// error instead of aborting when the element count overflows or the
    /// allocator refuses.
    pub fn filled(rows: usize, cols: usize, value: VT) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            VexecError::Allocation(format!("{}x{} overflows the addressable size", rows, cols))
        })?;
        let mut values = Vec::new();
        values.try_reserve_exact(len).map_err(|e| {
            VexecError::Allocation(format!("{}x{} matrix: {}", rows, cols, e))
        })?;
        values.resize(len, value);
        Ok(Self {
            values: Arc::new(values),
            offset: 0,
            rows,
            cols,
            row_skip: cols,
        })
    }

    /// Wrap a row-major value vector.
    pub fn from_vec(rows: usize, cols: usize, values: Vec<VT>) -> Result<Self> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            VexecError::Shape(format!("{}x{} overflows the addressable size", rows, cols))
        })?;
        if values.len() != len {
            return Err(VexecError::Shape(format!(
                "expected {} values for a {}x{} matrix, got {}",
                len,
                rows,
                cols,
                values.len()
            )));
        }
        Ok(Self {
            values: Arc::new(values),
            offset: 0,
            rows,
            cols,
            row_skip: cols,
        })
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: &[Vec<VT>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(VexecError::Shape(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            values.extend_from_slice(row);
        }
        Self::from_vec(rows.len(), cols, values)
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Whether this matrix shares its buffer with another handle (a view or its parent).
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.values) > 1
    }

    /// Whether `self` and `other` read from the same underlying buffer.
    pub fn shares_buffer_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<VT> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.values[self.offset + row * self.row_skip + col])
    }

    /// Borrow one row.
    pub fn row(&self, row: usize) -> Option<&[VT]> {
        if row >= self.rows {
            return None;
        }
        let start = self.offset + row * self.row_skip;
        Some(&self.values[start..start + self.cols])
    }

    /// Iterate over the rows of the matrix.
    pub fn rows_iter(&self) -> impl Iterator<Item = &[VT]> + '_ {
        (0..self.rows).map(move |r| {
            let start = self.offset + r * self.row_skip;
            &self.values[start..start + self.cols]
        })
    }

    /// Copy the logical contents into a contiguous row-major vector.
    pub fn to_vec(&self) -> Vec<VT> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for row in self.rows_iter() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Zero-copy view of rows `[rl, ru)`.
    pub fn slice_rows(&self, rl: usize, ru: usize) -> Result<Self> {
        if rl > ru || ru > self.rows {
            return Err(VexecError::Shape(format!(
                "row range [{}, {}) out of bounds for {} rows",
                rl, ru, self.rows
            )));
        }
        Ok(Self {
            values: Arc::clone(&self.values),
            offset: self.offset + rl * self.row_skip,
            rows: ru - rl,
            cols: self.cols,
            row_skip: self.row_skip,
        })
    }

    /// Elementwise `self += other`. Shapes must match exactly.
    pub fn add_assign(&mut self, other: &Self) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(VexecError::Shape(format!(
                "cannot accumulate {}x{} into {}x{}",
                other.rows, other.cols, self.rows, self.cols
            )));
        }
        let (offset, row_skip, cols) = (self.offset, self.row_skip, self.cols);
        let values = Arc::make_mut(&mut self.values);
        for (r, src) in other.rows_iter().enumerate() {
            let start = offset + r * row_skip;
            for (dst, v) in values[start..start + cols].iter_mut().zip(src) {
                *dst += *v;
            }
        }
        Ok(())
    }

    /// Copy `src` into this matrix starting at `row_offset`.
    pub fn copy_rows_from(&mut self, src: &Self, row_offset: usize) -> Result<()> {
        if src.cols != self.cols {
            return Err(VexecError::Shape(format!(
                "cannot place {} columns into a matrix with {} columns",
                src.cols, self.cols
            )));
        }
        if row_offset + src.rows > self.rows {
            return Err(VexecError::Shape(format!(
                "rows [{}, {}) exceed target of {} rows",
                row_offset,
                row_offset + src.rows,
                self.rows
            )));
        }
        let (offset, row_skip, cols) = (self.offset, self.row_skip, self.cols);
        let values = Arc::make_mut(&mut self.values);
        for (r, row) in src.rows_iter().enumerate() {
            let start = offset + (row_offset + r) * row_skip;
            values[start..start + cols].copy_from_slice(row);
        }
        Ok(())
    }

    /// Copy `src` into this matrix starting at `col_offset`.
    pub fn copy_cols_from(&mut self, src: &Self, col_offset: usize) -> Result<()> {
        if src.rows != self.rows {
            return Err(VexecError::Shape(format!(
                "cannot place {} rows into a matrix with {} rows",
                src.rows, self.rows
            )));
        }
        if col_offset + src.cols > self.cols {
            return Err(VexecError::Shape(format!(
                "columns [{}, {}) exceed target of {} columns",
                col_offset,
                col_offset + src.cols,
                self.cols
            )));
        }
        let (offset, row_skip) = (self.offset, self.row_skip);
        let width = src.cols;
        let values = Arc::make_mut(&mut self.values);
        for (r, row) in src.rows_iter().enumerate() {
            let start = offset + r * row_skip + col_offset;
            values[start..start + width].copy_from_slice(row);
        }
        Ok(())
    }
}

impl<VT: Element> Debug for DenseMatrix<VT> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DenseMatrix")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("values", &self.to_vec())
            .finish()
    }
}

impl<VT: Element> PartialEq for DenseMatrix<VT> {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape() && self.rows_iter().eq(other.rows_iter())
    }
}
