use std::sync::{Arc, Mutex};

use tracing::debug;
use vexec_core::{DenseMatrix, Element, Result, VexecError};

/// Output slots guarded by a [`SharedResult`] lock.
#[derive(Debug)]
pub struct ResultSlots<VT: Element> {
    outputs: Vec<Option<DenseMatrix<VT>>>,
    allocations: usize,
}

impl<VT: Element> ResultSlots<VT> {
    /// Return output `idx`, allocating a zeroed `rows x cols` matrix on first use.
    ///
    /// Must only be reached through [`SharedResult::with_slots`], so concurrent
    /// callers observe exactly one allocation per slot.
    pub fn get_or_allocate(
        &mut self,
        idx: usize,
        rows: usize,
        cols: usize,
    ) -> Result<&mut DenseMatrix<VT>> {
        let num_outputs = self.outputs.len();
        let slot = self.outputs.get_mut(idx).ok_or_else(|| {
            VexecError::Shape(format!("output {} out of range ({} outputs)", idx, num_outputs))
        })?;
        if slot.is_none() {
            debug!(output = idx, rows, cols, "allocating shared result");
            *slot = Some(DenseMatrix::zeros(rows, cols)?);
            self.allocations += 1;
        }
        slot.as_mut()
            .ok_or_else(|| VexecError::Allocation(format!("output {} missing after allocation", idx)))
    }

    pub fn get(&self, idx: usize) -> Option<&DenseMatrix<VT>> {
        self.outputs.get(idx).and_then(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Lazily allocated, mutex-guarded result populated cooperatively by all
/// tasks of one pipeline invocation. Cloning shares the same slots.
#[derive(Debug)]
pub struct SharedResult<VT: Element> {
    inner: Arc<Mutex<ResultSlots<VT>>>,
}

impl<VT: Element> Clone for SharedResult<VT> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<VT: Element> SharedResult<VT> {
    /// Create `num_outputs` empty slots.
    pub fn new(num_outputs: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResultSlots {
                outputs: vec![None; num_outputs],
                allocations: 0,
            })),
        }
    }

    /// Run `f` with the slots locked. The lock is released when `f` returns.
    pub fn with_slots<R>(&self, f: impl FnOnce(&mut ResultSlots<VT>) -> Result<R>) -> Result<R> {
        let mut slots = self
            .inner
            .lock()
            .map_err(|e| VexecError::LockPoisoned(format!("shared result lock: {}", e)))?;
        f(&mut slots)
    }

    /// Snapshot of output `idx`, if it has been allocated.
    ///
    /// The snapshot owns its own buffer, so later merges into the slot keep
    /// writing in place instead of copying the whole result.
    pub fn get(&self, idx: usize) -> Result<Option<DenseMatrix<VT>>> {
        self.with_slots(|slots| {
            slots
                .get(idx)
                .map(|m| DenseMatrix::from_vec(m.num_rows(), m.num_cols(), m.to_vec()))
                .transpose()
        })
    }

    /// Number of allocations performed across all slots.
    pub fn allocations(&self) -> Result<usize> {
        self.with_slots(|slots| Ok(slots.allocations))
    }

    /// Whether two handles refer to the same slots.
    pub fn same_slots(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Take every output, leaving the slots empty. Called by the scheduler
    /// once all contributing tasks have joined.
    pub fn take_outputs(&self) -> Result<Vec<Option<DenseMatrix<VT>>>> {
        self.with_slots(|slots| {
            let n = slots.outputs.len();
            Ok(std::mem::replace(&mut slots.outputs, vec![None; n]))
        })
    }
}
