use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VexecError;

/// Execution device a batch runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,
    /// Accelerator with device index.
    Cuda(usize),
}

impl Device {
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda(_))
    }

    pub fn cuda_index(&self) -> Option<usize> {
        match self {
            Device::Cuda(idx) => Some(*idx),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(idx) => write!(f, "cuda:{idx}"),
        }
    }
}

impl FromStr for Device {
    type Err = VexecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "cpu" {
            return Ok(Device::Cpu);
        }
        if s == "cuda" || s == "gpu" {
            return Ok(Device::Cuda(0));
        }
        if let Some(idx) = s.strip_prefix("cuda:").or_else(|| s.strip_prefix("gpu:")) {
            return idx
                .parse()
                .map(Device::Cuda)
                .map_err(|_| VexecError::Config(format!("invalid device index in '{}'", s)));
        }
        Err(VexecError::Config(format!("unknown device '{}'", s)))
    }
}

impl TryFrom<String> for Device {
    type Error = VexecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}
