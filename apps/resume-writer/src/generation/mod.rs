// Summary generation: prompt building, the guarded generation pipeline, and
// output normalization. All model calls go through llm_client.

pub mod generator;
pub mod output_parser;
pub mod prompts;
