use thiserror::Error;

use crate::schema::RecordKind;

/// Result type alias for avatar DAT operations
pub type Result<T> = std::result::Result<T, DatError>;

/// Errors that can occur while reading, editing or writing avatar DAT files
#[derive(Error, Debug)]
pub enum DatError {
    /// Buffer too small to contain the file header
    #[error("Buffer too small: expected at least {expected} bytes, got {got}")]
    BufferTooSmall { expected: usize, got: usize },

    /// Record payload is not a whole number of records
    #[error(
        "Truncated {kind} file: payload of {payload} bytes is not a multiple of the {record_size}-byte record size ({remainder} trailing bytes)"
    )]
    TruncatedRecord {
        kind: RecordKind,
        record_size: usize,
        payload: usize,
        remainder: usize,
    },

    /// Numeric value does not fit its fixed-width slot
    #[error("Value {value} does not fit field {field} ({min}..={max})")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Encoded string is wider than its slot
    #[error("String for field {field} is {len} bytes, slot holds {width}")]
    StringTooLong {
        field: &'static str,
        len: usize,
        width: usize,
    },

    /// Value kind does not match the field type
    #[error("Type mismatch for field {field}: expected {expected}, got {got}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    /// String encoding error
    #[error("String encoding error: {0}")]
    EncodingError(String),

    /// Record index out of bounds
    #[error("Record index out of bounds: {index} (len: {len})")]
    EntryIndexOutOfBounds { index: usize, len: usize },

    /// Save requested without a destination path
    #[error("No output path: open a file or choose a destination first")]
    NoPath,

    /// No file loaded in the store
    #[error("No records loaded")]
    NothingLoaded,

    /// A user-supplied value was rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DatError {
    /// Whether this error means the binary data itself is malformed or cannot be encoded
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DatError::BufferTooSmall { .. }
                | DatError::TruncatedRecord { .. }
                | DatError::ValueOutOfRange { .. }
                | DatError::StringTooLong { .. }
                | DatError::TypeMismatch { .. }
                | DatError::EncodingError(_)
        )
    }
}

impl From<csv::Error> for DatError {
    fn from(err: csv::Error) -> Self {
        DatError::CsvError(err.to_string())
    }
}

/// A proposed field value that was rejected before reaching a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No field with this name exists in any layout
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The field exists but not in this record kind's layout
    #[error("{field} is not available for {kind} records")]
    FieldUnavailable {
        field: &'static str,
        kind: RecordKind,
    },

    /// Nothing was entered for a numeric or flag field
    #[error("{0} requires a value")]
    Empty(&'static str),

    /// Text is longer than the slot allows
    #[error("{field} allows at most {max} bytes, got {len}")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    /// Text cannot be stored (NUL byte or unencodable character)
    #[error("{field} contains text that cannot be stored: {reason}")]
    InvalidText {
        field: &'static str,
        reason: &'static str,
    },

    /// Non-digit characters in a numeric field
    #[error("{field} must be a number, got {value:?}")]
    NotNumeric { field: &'static str, value: String },

    /// Flag fields only take 0 or 1
    #[error("{field} must be 0 or 1, got {value:?}")]
    NotBoolean { field: &'static str, value: String },

    /// Number outside the slot's range
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: i64,
        max: i64,
    },
}

impl ValidationError {
    /// Name of the field the rejected value was meant for
    pub fn field(&self) -> &str {
        match self {
            ValidationError::UnknownField(name) => name.as_str(),
            ValidationError::FieldUnavailable { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidText { field, .. }
            | ValidationError::NotNumeric { field, .. }
            | ValidationError::NotBoolean { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Empty(field) => *field,
        }
    }
}
