//! Data models for seedling-elab

pub mod schema;
pub mod seed;
pub mod session;

pub use schema::{keys, FieldDefinition, FieldKind, Metadata, MetadataSchema, SuggestionRule};
pub use seed::Seed;
pub use session::{ElaborationSession, HistoryEntry, SessionState, StateTransition};
