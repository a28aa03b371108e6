//! Reconciliation and pipeline orchestration.
//!
//! [`Processor`] turns one candidate into a typed outcome against an injected
//! [`jobsink_core::JobStore`]; [`pipeline::ImportPipeline`] drives a full
//! sweep: fetch → extract → normalize → run accounting → enqueue.

pub mod memory;
pub mod pipeline;
pub mod processor;

pub use memory::{MemoryJobStore, MemoryRunStore};
pub use pipeline::{ImportPipeline, ImportRunSummary, PipelineError};
pub use processor::Processor;
