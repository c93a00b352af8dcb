//! Accelerated execution path.
//!
//! Same task contract as the CPU path; only the [`BatchExecutor`] differs.
//! The device layer is reached through [`DeviceBackend`]; [`HostEmulatedDevice`]
//! implements it in host memory for machines without an accelerator.
//!
//! [`BatchExecutor`]: crate::vectorized::BatchExecutor

pub mod backend;
pub mod buffer;
pub mod executor;
pub mod kernels;

pub use backend::{DeviceBackend, HostEmulatedDevice};
pub use buffer::DeviceBuffer;
pub use executor::{DeviceBatchExecutor, DeviceKernelFn};
pub use kernels::Activation;
