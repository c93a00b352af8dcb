//! Device-side kernels. Each launch allocates its output through the backend
//! and runs the same loop as the host kernel of the same name.

use vexec_core::{Element, Result};

use super::backend::DeviceBackend;
use super::buffer::DeviceBuffer;
use crate::kernels::{add_into, check_add_shapes, col_sums_into, relu_into};

/// Supported activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
}

impl Activation {
    /// Forward pass of the activation on a device buffer.
    pub fn forward<VT: Element>(
        &self,
        backend: &dyn DeviceBackend<VT>,
        x: &DeviceBuffer<VT>,
    ) -> Result<DeviceBuffer<VT>> {
        match self {
            Activation::Relu => relu_forward(backend, x),
        }
    }
}

pub fn ewise_add<VT: Element>(
    backend: &dyn DeviceBackend<VT>,
    a: &DeviceBuffer<VT>,
    b: &DeviceBuffer<VT>,
) -> Result<DeviceBuffer<VT>> {
    let broadcast = check_add_shapes(a.shape(), b.shape())?;
    let (rows, cols) = a.shape();
    let mut out = backend.alloc_zeros(rows, cols)?;
    add_into(out.as_mut_slice(), a.as_slice(), b.as_slice(), cols, broadcast);
    Ok(out)
}

pub fn relu_forward<VT: Element>(
    backend: &dyn DeviceBackend<VT>,
    x: &DeviceBuffer<VT>,
) -> Result<DeviceBuffer<VT>> {
    let (rows, cols) = x.shape();
    let mut out = backend.alloc_zeros(rows, cols)?;
    relu_into(out.as_mut_slice(), x.as_slice());
    Ok(out)
}

/// Column sums into a `1 x cols` buffer.
pub fn col_sums<VT: Element>(
    backend: &dyn DeviceBackend<VT>,
    x: &DeviceBuffer<VT>,
) -> Result<DeviceBuffer<VT>> {
    let cols = x.num_cols();
    let mut out = backend.alloc_zeros(1, cols)?;
    col_sums_into(out.as_mut_slice(), x.as_slice(), cols);
    Ok(out)
}
