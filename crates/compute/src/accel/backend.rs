use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;
use vexec_core::{DenseMatrix, Device, Element, Result, VexecError};

use super::buffer::DeviceBuffer;

/// Device layer contract: buffer allocation and host/device transfers.
pub trait DeviceBackend<VT: Element>: Send + Sync {
    fn device(&self) -> Device;

    /// Allocate a zeroed device buffer.
    fn alloc_zeros(&self, rows: usize, cols: usize) -> Result<DeviceBuffer<VT>>;

    /// Copy a host matrix (or view) to a new device buffer (H2D).
    fn upload(&self, host: &DenseMatrix<VT>) -> Result<DeviceBuffer<VT>>;

    /// Copy a device buffer back to host memory (D2H).
    fn download(&self, buffer: &DeviceBuffer<VT>) -> Result<DenseMatrix<VT>>;
}

/// Backend whose device memory lives on the host, tagged with a [`Device`].
///
/// Stands in for an accelerator when none is present. An optional element
/// capacity makes device memory exhaustion observable.
#[derive(Debug)]
pub struct HostEmulatedDevice {
    device: Device,
    capacity: Option<usize>,
    in_use: Arc<AtomicUsize>,
}

impl HostEmulatedDevice {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            capacity: None,
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Limit the number of elements that may be resident at once.
    pub fn with_capacity(mut self, elements: usize) -> Self {
        self.capacity = Some(elements);
        self
    }

    /// Elements currently held by live buffers.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    fn reserve(&self, elements: usize) -> Result<Arc<AtomicUsize>> {
        let Some(capacity) = self.capacity else {
            self.in_use.fetch_add(elements, Ordering::AcqRel);
            return Ok(Arc::clone(&self.in_use));
        };
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(elements).filter(|total| *total <= capacity)
            })
            .map_err(|used| {
                warn!(device = %self.device, used, requested = elements, capacity, "device memory exhausted");
                VexecError::Allocation(format!(
                    "{}: cannot allocate {} elements ({} of {} in use)",
                    self.device, elements, used, capacity
                ))
            })?;
        Ok(Arc::clone(&self.in_use))
    }
}

impl<VT: Element> DeviceBackend<VT> for HostEmulatedDevice {
    fn device(&self) -> Device {
        self.device
    }

    fn alloc_zeros(&self, rows: usize, cols: usize) -> Result<DeviceBuffer<VT>> {
        let len = rows.checked_mul(cols).ok_or_else(|| {
            VexecError::Allocation(format!("{}x{} overflows the addressable size", rows, cols))
        })?;
        let lease = self.reserve(len)?;
        Ok(DeviceBuffer::new(self.device, rows, cols, vec![VT::default(); len], Some(lease)))
    }

    fn upload(&self, host: &DenseMatrix<VT>) -> Result<DeviceBuffer<VT>> {
        let (rows, cols) = host.shape();
        let lease = self.reserve(rows * cols)?;
        Ok(DeviceBuffer::new(self.device, rows, cols, host.to_vec(), Some(lease)))
    }

    fn download(&self, buffer: &DeviceBuffer<VT>) -> Result<DenseMatrix<VT>> {
        if buffer.device() != self.device {
            return Err(VexecError::Device(format!(
                "buffer lives on {}, backend is {}",
                buffer.device(),
                self.device
            )));
        }
        DenseMatrix::from_vec(buffer.num_rows(), buffer.num_cols(), buffer.as_slice().to_vec())
    }
}
