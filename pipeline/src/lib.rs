pub mod config;
pub mod export;
pub mod message;
pub mod pipeline_stream;
pub mod train_stream;

mod error;

pub use error::{PipelineError, Result};
