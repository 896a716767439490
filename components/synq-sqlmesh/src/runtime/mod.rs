/// Collection and upload pipelines.
pub mod runtime;
