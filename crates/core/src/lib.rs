pub mod config;
pub mod device;
pub mod error;
pub mod matrix;

pub use config::{ExecutorConfig, load_dotenv};
pub use device::Device;
pub use error::*;
pub use matrix::{DenseMatrix, Element};
