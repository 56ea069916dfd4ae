pub mod config;
pub mod pipeline;
pub mod processor;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineMode, PipelineReport};
pub use processor::*;
