use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vexec_core::{Device, Element};

/// A device-resident `rows x cols` buffer.
///
/// Buffers created by a capacity-tracking backend hold a lease on the
/// backend's usage counter and give it back when dropped.
#[derive(Debug)]
pub struct DeviceBuffer<VT: Element> {
    device: Device,
    rows: usize,
    cols: usize,
    data: Vec<VT>,
    lease: Option<Arc<AtomicUsize>>,
}

impl<VT: Element> DeviceBuffer<VT> {
    pub(crate) fn new(
        device: Device,
        rows: usize,
        cols: usize,
        data: Vec<VT>,
        lease: Option<Arc<AtomicUsize>>,
    ) -> Self {
        Self {
            device,
            rows,
            cols,
            data,
            lease,
        }
    }

    pub fn device(&self) -> Device {
        self.device
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

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Device-side view of the elements, row-major.
    pub fn as_slice(&self) -> &[VT] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [VT] {
        &mut self.data
    }
}

impl<VT: Element> Drop for DeviceBuffer<VT> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            lease.fetch_sub(self.data.len(), Ordering::AcqRel);
        }
    }
}
