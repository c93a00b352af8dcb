use std::sync::Arc;

use tracing::trace;
use vexec_core::{DenseMatrix, Element, Result, VexecError};

use super::backend::DeviceBackend;
use super::buffer::DeviceBuffer;
use crate::vectorized::batch::{BatchExecutor, collect_outputs};
use crate::vectorized::context::ExecContext;
use crate::vectorized::task::TaskKind;

/// Compiled device-side body of a pipeline: one or more kernel launches
/// reading the uploaded batch buffers and filling one slot per output.
pub type DeviceKernelFn<VT> = Arc<
    dyn Fn(
            &dyn DeviceBackend<VT>,
            &[DeviceBuffer<VT>],
            &mut [Option<DeviceBuffer<VT>>],
            &ExecContext,
        ) -> Result<()>
        + Send
        + Sync,
>;

/// Runs batches on an accelerator.
///
/// Batch views are uploaded, the kernels run against device buffers, and the
/// outputs are copied back to host memory before the task merges them, so
/// the shared result stays host-visible and the combine step is the same as
/// on the CPU path. Device buffers are released before `run_batch` returns.
pub struct DeviceBatchExecutor<VT: Element> {
    kernel: DeviceKernelFn<VT>,
    backend: Arc<dyn DeviceBackend<VT>>,
}

impl<VT: Element> DeviceBatchExecutor<VT> {
    pub fn new(kernel: DeviceKernelFn<VT>, backend: Arc<dyn DeviceBackend<VT>>) -> Self {
        Self { kernel, backend }
    }

    /// Wrap a closure as a shared executor handle.
    pub fn shared<F>(backend: Arc<dyn DeviceBackend<VT>>, kernel: F) -> Arc<dyn BatchExecutor<VT>>
    where
        F: Fn(
                &dyn DeviceBackend<VT>,
                &[DeviceBuffer<VT>],
                &mut [Option<DeviceBuffer<VT>>],
                &ExecContext,
            ) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self::new(Arc::new(kernel), backend))
    }

    pub fn backend(&self) -> &Arc<dyn DeviceBackend<VT>> {
        &self.backend
    }
}

impl<VT: Element> BatchExecutor<VT> for DeviceBatchExecutor<VT> {
    fn kind(&self) -> TaskKind {
        TaskKind::CompiledPipelineAccelerated
    }

    fn run_batch(
        &self,
        inputs: &[DenseMatrix<VT>],
        num_outputs: usize,
        ctx: &ExecContext,
    ) -> Result<Vec<DenseMatrix<VT>>> {
        let backend = self.backend.as_ref();
        // A CPU context leaves device choice to the pipeline; an accelerator
        // context pins the batch to that device.
        if ctx.device().is_accelerator() && ctx.device() != backend.device() {
            return Err(VexecError::Device(format!(
                "invocation targets {}, pipeline backend is {}",
                ctx.device(),
                backend.device()
            )));
        }
        let device_inputs = inputs
            .iter()
            .map(|input| backend.upload(input))
            .collect::<Result<Vec<_>>>()?;

        let mut device_outputs: Vec<Option<DeviceBuffer<VT>>> =
            (0..num_outputs).map(|_| None).collect();
        (self.kernel)(backend, &device_inputs, &mut device_outputs, ctx)?;
        drop(device_inputs);

        let outputs = collect_outputs(device_outputs)?
            .iter()
            .map(|buf| backend.download(buf))
            .collect::<Result<Vec<_>>>()?;
        trace!(device = %backend.device(), outputs = outputs.len(), "device batch downloaded");
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use vexec_core::{Device, ExecutorConfig};

    use super::*;
    use crate::accel::backend::HostEmulatedDevice;
    use crate::accel::kernels;

    #[test]
    fn runs_kernel_and_downloads() {
        let device = Arc::new(HostEmulatedDevice::new(Device::Cuda(0)));
        let exec = DeviceBatchExecutor::<f64>::shared(device.clone(), |backend, inputs, outputs, _ctx| {
            outputs[0] = Some(kernels::ewise_add(backend, &inputs[0], &inputs[1])?);
            Ok(())
        });
        let a = DenseMatrix::filled(2, 2, 1.0).unwrap();
        let b = DenseMatrix::filled(1, 2, 2.0).unwrap();
        let out = exec.run_batch(&[a, b], 1, &ExecContext::default()).unwrap();
        assert_eq!(out[0].to_vec(), vec![3.0; 4]);
        assert_eq!(exec.kind(), TaskKind::CompiledPipelineAccelerated);
        assert_eq!(device.in_use(), 0, "device buffers must be released after the batch");
    }

    #[test]
    fn device_exhaustion_is_resource_error() {
        let device = Arc::new(HostEmulatedDevice::new(Device::Cuda(0)).with_capacity(3));
        let exec = DeviceBatchExecutor::<f64>::shared(device.clone(), |backend, inputs, outputs, _ctx| {
            outputs[0] = Some(kernels::relu_forward(backend, &inputs[0])?);
            Ok(())
        });
        let err = exec
            .run_batch(&[DenseMatrix::zeros(2, 2).unwrap()], 1, &ExecContext::default())
            .unwrap_err();
        assert!(err.is_resource());
        assert_eq!(device.in_use(), 0);
    }

    #[test]
    fn missing_device_output_is_compute_error() {
        let device = Arc::new(HostEmulatedDevice::new(Device::Cuda(0)));
        let exec = DeviceBatchExecutor::<f64>::shared(device, |_backend, _inputs, _outputs, _ctx| Ok(()));
        let err = exec.run_batch(&[], 1, &ExecContext::default()).unwrap_err();
        assert!(matches!(err, VexecError::Compute(_)));
    }

    #[test]
    fn context_pinned_to_another_device_is_rejected() {
        let device = Arc::new(HostEmulatedDevice::new(Device::Cuda(0)));
        let exec = DeviceBatchExecutor::<f64>::shared(device.clone(), |backend, inputs, outputs, _ctx| {
            outputs[0] = Some(kernels::relu_forward(backend, &inputs[0])?);
            Ok(())
        });
        let input = DenseMatrix::filled(2, 2, 1.0).unwrap();

        let pinned = ExecContext::new(ExecutorConfig {
            device: Device::Cuda(1),
            ..Default::default()
        });
        let err = exec.run_batch(&[input.clone()], 1, &pinned).unwrap_err();
        assert!(matches!(err, VexecError::Device(_)));
        assert_eq!(device.in_use(), 0);

        let matching = ExecContext::new(ExecutorConfig {
            device: Device::Cuda(0),
            ..Default::default()
        });
        assert!(exec.run_batch(&[input.clone()], 1, &matching).is_ok());
        assert!(exec.run_batch(&[input], 1, &ExecContext::default()).is_ok());
    }
}
