//! Metadata validation
//!
//! Completeness scoring plus advisory range checks on extracted values.

pub mod completeness;

use crate::models::schema::{Metadata, MetadataSchema};

/// Advisory warnings for extracted values outside a field's declared range
///
/// Warnings never block a merge; they are surfaced to the client as
/// `validationErrors`.
pub fn range_warnings(delta: &Metadata, schema: &MetadataSchema) -> Vec<String> {
    delta
        .iter()
        .filter_map(|(name, value)| schema.field(name)?.range_warning(value))
        .collect()
}
