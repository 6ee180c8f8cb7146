//! Column type inference from a bounded sample of records.
//!
//! Inference is a narrowing optimization only: cells that later violate the
//! inferred type are imported as text (see [`Value::coerce`](crate::Value::coerce)).

use crate::models::ColumnType;
use crate::reader::Record;

/// Number of data records examined per table when inferring types.
pub const DEFAULT_SAMPLE_ROWS: usize = 100;

/// Classify a single cell. Empty cells carry no type information.
pub fn classify(cell: &str) -> Option<ColumnType> {
    if cell.is_empty() {
        None
    } else if is_integer(cell) {
        Some(ColumnType::Integer)
    } else if is_real(cell) {
        Some(ColumnType::Real)
    } else {
        Some(ColumnType::Text)
    }
}

/// Infer one type per column; the least specific type seen wins.
///
/// Columns with no typed cell in the sample default to text.
pub fn infer(sample: &[Record], column_count: usize) -> Vec<ColumnType> {
    let mut widest: Vec<Option<ColumnType>> = vec![None; column_count];

    for record in sample {
        for (slot, cell) in widest.iter_mut().zip(record.iter()) {
            if let Some(ty) = classify(cell) {
                *slot = Some(slot.map_or(ty, |current| current.max(ty)));
            }
        }
    }

    widest
        .into_iter()
        .map(|ty| ty.unwrap_or(ColumnType::Text))
        .collect()
}

/// Decimal integer that fits in i64 and survives a round trip unchanged.
///
/// Leading zeros (`007`) are rejected so identifiers such as postal codes
/// keep their text form.
pub fn is_integer(cell: &str) -> bool {
    let digits = cell.strip_prefix(['-', '+']).unwrap_or(cell);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return false;
    }
    cell.parse::<i64>().is_ok()
}

/// Finite decimal number such as `1.5`, `-.25` or `6.02e23`.
///
/// Spellings Rust would accept but SQL would not (`inf`, `NaN`) are rejected.
pub fn is_real(cell: &str) -> bool {
    let unsigned = cell.strip_prefix(['-', '+']).unwrap_or(cell);
    if !unsigned.bytes().any(|b| b.is_ascii_digit()) {
        return false;
    }
    if !unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'-' | b'+'))
    {
        return false;
    }
    let int_part = unsigned
        .split(['.', 'e', 'E'])
        .next()
        .unwrap_or_default();
    if int_part.len() > 1 && int_part.starts_with('0') {
        return false;
    }
    cell.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}
