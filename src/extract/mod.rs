pub mod block;
pub mod classifier;
pub mod fields;
pub mod pasted;
pub mod pipeline;

pub use pipeline::{run_pipeline, CheckRequest};
