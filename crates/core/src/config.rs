use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{Result, VexecError};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_opt(key) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| VexecError::Config(format!("{}: cannot parse '{}'", key, v))),
        None => Ok(None),
    }
}

/// Vectorized executor configuration, typically parsed from TOML or env.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Rows per batch inside one task.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Device batches are executed on.
    #[serde(default)]
    pub device: Device,
    /// Element capacity of the host-emulated accelerator. `None` = unlimited.
    #[serde(default)]
    pub emulated_device_capacity: Option<usize>,
}

fn default_worker_threads() -> usize { 0 }
fn default_batch_size() -> usize { 100 }

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            batch_size: default_batch_size(),
            device: Device::default(),
            emulated_device_capacity: None,
        }
    }
}

impl ExecutorConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from environment variables (call `load_dotenv()` first).
    /// Unset keys keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `VEXEC_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(n) = env_parse("VEXEC_WORKER_THREADS")? {
            self.worker_threads = n;
        }
        if let Some(n) = env_parse("VEXEC_BATCH_SIZE")? {
            self.batch_size = n;
        }
        if let Some(d) = env_opt("VEXEC_DEVICE") {
            self.device = d.parse()?;
        }
        if let Some(n) = env_parse("VEXEC_EMULATED_DEVICE_CAPACITY")? {
            self.emulated_device_capacity = Some(n);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(VexecError::Config("batch_size must be greater than 0".into()));
        }
        if self.emulated_device_capacity == Some(0) {
            return Err(VexecError::Config(
                "emulated_device_capacity must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Executor config loaded:");
        tracing::info!("  workers:     {}", self.resolved_worker_threads());
        tracing::info!("  batch_size:  {}", self.batch_size);
        tracing::info!("  device:      {}", self.device);
        if let Some(cap) = self.emulated_device_capacity {
            tracing::info!("  device_cap:  {} elements", cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.device, Device::Cpu);
        assert!(config.emulated_device_capacity.is_none());
    }

    #[test]
    fn resolved_worker_threads() {
        let mut config = ExecutorConfig::default();
        // 0 means auto-detect
        assert!(config.resolved_worker_threads() > 0);

        config.worker_threads = 8;
        assert_eq!(config.resolved_worker_threads(), 8);
    }

    #[test]
    fn parse_minimal_toml() {
        let config = ExecutorConfig::from_toml("").unwrap();
        assert_eq!(config, ExecutorConfig::default());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
worker_threads = 6
batch_size = 32
device = "cuda:1"
emulated_device_capacity = 4096
"#;
        let config = ExecutorConfig::from_toml(toml).unwrap();
        assert_eq!(config.worker_threads, 6);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.device, Device::Cuda(1));
        assert_eq!(config.emulated_device_capacity, Some(4096));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let err = ExecutorConfig::from_toml("batch_size = 0").unwrap_err();
        assert!(matches!(err, VexecError::Config(_)));
    }

    #[test]
    fn bad_device_rejected() {
        assert!(ExecutorConfig::from_toml("device = \"abacus\"").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ExecutorConfig::from_file("/nonexistent/vexec.toml").unwrap_err();
        assert!(matches!(err, VexecError::Io(_)));
    }
}
