//! vexec-run: run a synthetic vectorized pipeline and print a JSON summary.
//!
//! Pipelines:
//! - `add`: `x + bias` with a broadcast bias row, placed by rows
//! - `sum`: column sums of `x`, accumulated across tasks
//! - `relu`: `max(x, 0)`, placed by rows
//!
//! The device comes from the config (`VEXEC_DEVICE` or `--device`); any
//! accelerator device runs on the host-emulated backend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use vexec_compute::accel::{self, DeviceBackend, DeviceBatchExecutor, HostEmulatedDevice};
use vexec_compute::vectorized::{BatchExecutor, CpuBatchExecutor};
use vexec_compute::{
    Activation, ExecutorMetrics, PipelineDescriptor, VectorCombine, VectorSplit,
    VectorizedExecutor, kernels,
};
use vexec_core::{DenseMatrix, Device, ExecutorConfig, load_dotenv};

// ── CLI ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
enum Op {
    Add,
    Sum,
    Relu,
}

/// Run a synthetic pipeline through the vectorized executor.
#[derive(Parser, Debug)]
#[command(name = "vexec-run", version, about)]
struct Cli {
    /// Pipeline to run.
    #[arg(long, value_enum, default_value_t = Op::Add)]
    op: Op,

    /// Rows of the generated input matrix.
    #[arg(long, env = "VEXEC_RUN_ROWS", default_value_t = 10_000)]
    rows: usize,

    /// Columns of the generated input matrix.
    #[arg(long, env = "VEXEC_RUN_COLS", default_value_t = 16)]
    cols: usize,

    /// Path to an executor TOML config. Environment variables are used when absent.
    #[arg(long, env = "VEXEC_CONFIG")]
    config: Option<PathBuf>,

    /// Override the worker thread count.
    #[arg(long)]
    workers: Option<usize>,

    /// Override the batch size.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Override the device (`cpu`, `cuda`, `cuda:N`).
    #[arg(long)]
    device: Option<Device>,

    /// Compare the result against a single-threaded host computation.
    #[arg(long)]
    verify: bool,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    op: Op,
    rows: usize,
    cols: usize,
    device: String,
    task_kind: &'static str,
    workers: usize,
    batch_size: usize,
    elapsed_ms: u64,
    output_shape: (usize, usize),
    checksum: f64,
    verified: Option<bool>,
    metrics: ExecutorMetrics,
}

// ── Pipelines ───────────────────────────────────────────────────────

fn synthetic(rows: usize, cols: usize, seed: usize) -> anyhow::Result<DenseMatrix<f64>> {
    let values = (0..rows * cols)
        .map(|i| ((i * 7 + seed) % 13) as f64 - 6.0)
        .collect();
    Ok(DenseMatrix::from_vec(rows, cols, values)?)
}

fn cpu_executor(op: Op) -> Arc<dyn BatchExecutor<f64>> {
    match op {
        Op::Add => CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
            outputs[0] = Some(kernels::ewise_add(&inputs[0], &inputs[1])?);
            Ok(())
        }),
        Op::Sum => CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
            outputs[0] = Some(kernels::col_sums(&inputs[0])?);
            Ok(())
        }),
        Op::Relu => CpuBatchExecutor::<f64>::shared(|inputs, outputs, _ctx| {
            outputs[0] = Some(kernels::relu_forward(&inputs[0])?);
            Ok(())
        }),
    }
}

fn device_executor(op: Op, backend: Arc<dyn DeviceBackend<f64>>) -> Arc<dyn BatchExecutor<f64>> {
    match op {
        Op::Add => DeviceBatchExecutor::<f64>::shared(backend, |dev, inputs, outputs, _ctx| {
            outputs[0] = Some(accel::kernels::ewise_add(dev, &inputs[0], &inputs[1])?);
            Ok(())
        }),
        Op::Sum => DeviceBatchExecutor::<f64>::shared(backend, |dev, inputs, outputs, _ctx| {
            outputs[0] = Some(accel::kernels::col_sums(dev, &inputs[0])?);
            Ok(())
        }),
        Op::Relu => DeviceBatchExecutor::<f64>::shared(backend, |dev, inputs, outputs, _ctx| {
            outputs[0] = Some(Activation::Relu.forward(dev, &inputs[0])?);
            Ok(())
        }),
    }
}

fn describe(op: Op, exec: Arc<dyn BatchExecutor<f64>>, rows: usize, cols: usize) -> PipelineDescriptor<f64> {
    let desc = PipelineDescriptor::new(exec).input(VectorSplit::Rows);
    match op {
        Op::Add => desc
            .input(VectorSplit::Rows)
            .output(VectorCombine::Rows, rows, cols),
        Op::Sum => desc.output(VectorCombine::Add, 1, cols),
        Op::Relu => desc.output(VectorCombine::Rows, rows, cols),
    }
}

fn reference(op: Op, inputs: &[DenseMatrix<f64>]) -> anyhow::Result<DenseMatrix<f64>> {
    Ok(match op {
        Op::Add => kernels::ewise_add(&inputs[0], &inputs[1])?,
        Op::Sum => kernels::col_sums(&inputs[0])?,
        Op::Relu => kernels::relu_forward(&inputs[0])?,
    })
}

fn load_config(cli: &Cli) -> anyhow::Result<ExecutorConfig> {
    let mut config = match &cli.config {
        Some(path) => ExecutorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ExecutorConfig::from_env()?,
    };
    if let Some(n) = cli.workers {
        config.worker_threads = n;
    }
    if let Some(n) = cli.batch_size {
        config.batch_size = n;
    }
    if let Some(d) = cli.device {
        config.device = d;
    }
    config.validate()?;
    Ok(config)
}

// ── Main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.log_summary();

    let batch_exec = match config.device {
        Device::Cpu => cpu_executor(cli.op),
        device => {
            let mut emulated = HostEmulatedDevice::new(device);
            if let Some(cap) = config.emulated_device_capacity {
                emulated = emulated.with_capacity(cap);
            }
            warn!(%device, "no accelerator runtime linked, using host-emulated device");
            device_executor(cli.op, Arc::new(emulated))
        }
    };
    let task_kind = batch_exec.kind().as_str();

    let mut inputs = vec![synthetic(cli.rows, cli.cols, 0)?];
    if cli.op == Op::Add {
        inputs.push(synthetic(1, cli.cols, 3)?);
    }
    let descriptor = Arc::new(describe(cli.op, batch_exec, cli.rows, cli.cols));

    let executor = VectorizedExecutor::new(config.clone())?;
    let start = Instant::now();
    let outputs = executor.execute(&descriptor, inputs.clone())?;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let output = outputs
        .into_iter()
        .next()
        .context("pipeline produced no output")?;

    let verified = if cli.verify {
        let ok = reference(cli.op, &inputs)? == output;
        if ok {
            info!("result matches single-threaded host computation");
        } else {
            warn!("result differs from single-threaded host computation");
        }
        Some(ok)
    } else {
        None
    };

    let summary = RunSummary {
        op: cli.op,
        rows: cli.rows,
        cols: cli.cols,
        device: config.device.to_string(),
        task_kind,
        workers: executor.num_workers(),
        batch_size: config.batch_size,
        elapsed_ms,
        output_shape: output.shape(),
        checksum: output.to_vec().iter().sum(),
        verified,
        metrics: executor.metrics()?,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if verified == Some(false) {
        anyhow::bail!("verification failed");
    }
    Ok(())
}
