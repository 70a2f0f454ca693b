use crate::schema::PrimitiveType;

/// Failures raised by the pure transformation stages.
///
/// None of these are retried: each one signals that the input violates a
/// structural contract, not a transient condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Table `{table}` does not match its schema: expected columns {expected:?}, actual {actual:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("No duration known for track `{track_id}`")]
    MissingDurationData { track_id: String },
    #[error("Malformed encoded list in field `{field}`: {cell:?}")]
    MalformedEncodedList { field: String, cell: String },
    #[error("Value {value:?} in field `{field}` is not a valid {expected}")]
    InvalidValue {
        field: String,
        expected: PrimitiveType,
        value: String,
    },
    #[error("Joined table has {actual} columns but the joined schema declares {expected}")]
    ColumnCountMismatch { expected: usize, actual: usize },
}
