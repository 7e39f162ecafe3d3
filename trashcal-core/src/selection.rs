//! Validation and normalization rules for user-entered selections.

use crate::model::CollectionType;

/// Smallest accepted horizon in days.
pub const MIN_DAYS_AHEAD: u32 = 1;
/// Largest accepted horizon in days.
pub const MAX_DAYS_AHEAD: u32 = 365;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Problems with the raw "days ahead" input.
pub enum DaysInputError {
    /// Input contains something other than digits.
    #[error("Days ahead must be a whole number between {MIN_DAYS_AHEAD} and {MAX_DAYS_AHEAD}.")]
    NotWholeNumber,
    /// Input is a number outside the accepted range.
    #[error("Days ahead must be between {MIN_DAYS_AHEAD} and {MAX_DAYS_AHEAD}.")]
    OutOfRange,
}

/// Validate the raw "days ahead" field.
///
/// Blank input is valid and yields `None`, which keeps the service default.
///
/// # Errors
///
/// Returns a [`DaysInputError`] when the input is not a whole number or is out of range.
pub fn validate_days_input(raw: &str) -> Result<Option<u32>, DaysInputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DaysInputError::NotWholeNumber);
    }

    // Digit strings too long for u32 are out of range as well.
    let days = trimmed
        .parse::<u32>()
        .map_err(|_parse_error| DaysInputError::OutOfRange)?;
    if (MIN_DAYS_AHEAD..=MAX_DAYS_AHEAD).contains(&days) {
        Ok(Some(days))
    } else {
        Err(DaysInputError::OutOfRange)
    }
}

/// Toggle a collection type, keeping at least one selected.
#[must_use]
pub fn toggle_type(current: &[CollectionType], value: CollectionType) -> Vec<CollectionType> {
    if !current.contains(&value) {
        let mut next = current.to_vec();
        next.push(value);
        return next;
    }

    let next: Vec<CollectionType> = current
        .iter()
        .copied()
        .filter(|existing| *existing != value)
        .collect();
    if next.is_empty() {
        current.to_vec()
    } else {
        next
    }
}

/// Deduplicate and order types (trash before recycling). An empty input yields every type.
#[must_use]
pub fn canonical_types(types: &[CollectionType]) -> Vec<CollectionType> {
    let ordered: Vec<CollectionType> = CollectionType::ALL
        .into_iter()
        .filter(|candidate| types.contains(candidate))
        .collect();
    if ordered.is_empty() {
        CollectionType::ALL.to_vec()
    } else {
        ordered
    }
}

/// Whether a canonical type list is the full default set.
#[must_use]
pub fn is_default_types(types: &[CollectionType]) -> bool {
    types == CollectionType::ALL
}

/// Comma-joined query form of a type list.
#[must_use]
pub fn join_types(types: &[CollectionType]) -> String {
    types
        .iter()
        .map(|collection_type| collection_type.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
