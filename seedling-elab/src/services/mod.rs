//! Service layer for seedling-elab

pub mod elaboration;
pub mod metadata_deriver;
pub mod suggestion_builder;

pub use elaboration::{
    AbandonOutcome, AnswerOutcome, ElaborationEngine, ElaborationError, ElaborationResult,
    HistoryOutcome, StartOutcome, StatusOutcome, DEFAULT_EXTRACTION_TIMEOUT,
};
