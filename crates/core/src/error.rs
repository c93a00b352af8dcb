use thiserror::Error;

#[derive(Error, Debug)]
pub enum VexecError {
    /// An input or output does not match the declared row/column expectations.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Allocation of a shared result or a device buffer failed.
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Failure inside a compiled function or device kernel.
    #[error("Compute error: {0}")]
    Compute(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// A worker queue lost its sender before delivering the shutdown sentinel.
    #[error("Queue disconnected: {0}")]
    QueueDisconnected(String),

    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VexecError {
    /// Whether the error belongs to the resource category.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            VexecError::Allocation(_) | VexecError::Device(_) | VexecError::QueueDisconnected(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VexecError>;
