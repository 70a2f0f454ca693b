//! Packing of multi-valued fields into a single tabular cell.

use crate::error::PipelineError;

/// Separator between values of a multi-valued cell.
pub const DELIMITER: char = '|';

/// Joins `values` into one cell. An empty list encodes to an empty cell.
///
/// A value carrying [`DELIMITER`] would come back as two values, so it is
/// rejected for `field`.
pub fn encode<S: AsRef<str>>(field: &str, values: &[S]) -> Result<String, PipelineError> {
    let mut cell = String::new();
    for (index, value) in values.iter().enumerate() {
        let value = value.as_ref();
        if value.contains(DELIMITER) {
            return Err(PipelineError::MalformedEncodedList {
                field: field.to_string(),
                cell: value.to_string(),
            });
        }
        if index > 0 {
            cell.push(DELIMITER);
        }
        cell.push_str(value);
    }
    Ok(cell)
}

/// Splits a cell produced by [`encode`].
///
/// An empty cell decodes to a single empty value, not to an empty list, so
/// `decode(encode([]))` is `[""]`. Downstream joins rely on that placeholder
/// to keep entities that have no values.
pub fn decode(cell: &str) -> Vec<String> {
    cell.split(DELIMITER).map(str::to_string).collect()
}
