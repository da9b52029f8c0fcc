pub mod generation_pipeline;
pub mod pipeline_state;

pub use generation_pipeline::{GenerationPipeline, StateObserver};
pub use pipeline_state::{PipelineState, Stage};
