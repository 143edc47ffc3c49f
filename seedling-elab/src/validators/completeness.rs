//! Completeness scoring
//!
//! `score = round(100 * populated_required / required)`, ties rounding
//! down. Optional fields never contribute. 100 is reserved for "every
//! required field populated", so a large schema with one gap never rounds
//! up to complete.

use crate::models::schema::{is_populated, Metadata, MetadataSchema};

/// Completeness percentage (0-100) of `metadata` against `schema`
pub fn score(metadata: &Metadata, schema: &MetadataSchema) -> u8 {
    let required = schema.required_count();
    let populated = schema
        .required_fields()
        .filter(|f| metadata.get(&f.name).is_some_and(is_populated))
        .count();

    percentage(populated, required)
}

/// Required fields not yet populated, in schema order
pub fn missing_fields(metadata: &Metadata, schema: &MetadataSchema) -> Vec<String> {
    schema
        .required_fields()
        .filter(|f| !metadata.get(&f.name).is_some_and(is_populated))
        .map(|f| f.name.clone())
        .collect()
}

/// Round-half-down integer percentage
///
/// `ceil(100p/r - 1/2)` computed as `(200p + r - 1) / 2r` in integers.
fn percentage(populated: usize, required: usize) -> u8 {
    if required == 0 {
        // Unreachable for validated schemas
        return 0;
    }
    if populated >= required {
        return 100;
    }

    let value = (200 * populated + required - 1) / (2 * required);
    value.min(99) as u8
}
