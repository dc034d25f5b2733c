//! Enrichment pipeline and run controller.
//!
//! [`pipeline::Pipeline`] answers "who is the CEO?" for a single row by
//! consulting providers in priority order. [`runner::Runner`] drives a
//! whole table through the pipeline, owns the run lifecycle, and writes
//! checkpoints and the final output.

pub mod normalize;
pub mod pipeline;
pub mod runner;

pub use pipeline::{Pipeline, PipelineBuilder, ProviderOutcome, RetryPolicy, RowReport};
pub use runner::{RunControls, RunOptions, Runner};
