//! Application layer: generation workflow and the `Studio` context.

pub mod orchestrator;
pub mod studio;

pub use orchestrator::{
    BatchReport, BatchStatus, GeneratedPage, GenerationOrchestrator, GenerationOutcome,
    GenerationSettings,
};
pub use studio::{PageMove, Studio};
