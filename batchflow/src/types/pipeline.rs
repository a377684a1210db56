/// Identifier of a pipeline, attached to its logs.
pub type PipelineId = u64;
