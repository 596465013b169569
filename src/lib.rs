pub mod compiler;
pub mod config;
pub mod document;
pub mod enrichment;
pub mod pipeline;
pub mod provider;
pub mod student;
pub mod utils;

pub use pipeline::{Pipeline, PipelineOutcome};
pub use utils::{GenError, GenResult};
