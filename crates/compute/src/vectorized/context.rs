use std::sync::Arc;

use uuid::Uuid;
use vexec_core::{Device, ExecutorConfig};

/// Per-invocation handle threaded through every batch call.
#[derive(Debug, Clone)]
pub struct ExecContext {
    invocation_id: Uuid,
    config: Arc<ExecutorConfig>,
}

impl ExecContext {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            config: Arc::new(config),
        }
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn device(&self) -> Device {
        self.config.device
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}
