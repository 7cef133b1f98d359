//! Field rules applied to user input before it reaches a record
//!
//! Every edit, single-cell or batch, enters as text and is turned into a
//! typed [`FieldValue`] here. Nothing in this module mutates a record.

use crate::error::ValidationError;
use crate::field::{Field, FieldId, FieldType, FieldValue};
use crate::io::{Encoding, encode_string};
use crate::schema::RecordKind;

/// Validate a proposed value for a field named `field_name`, with UTF-8 text
///
/// # Arguments
/// - `field_name` - The snake_case field name (e.g. `price_weekly_gold`)
/// - `input` - The text entered by the user, surrounding whitespace is ignored
/// - `kind` - The kind of record the value is meant for
///
/// # Returns
/// The typed value to store, or the reason it was rejected
pub fn validate(
    field_name: &str,
    input: &str,
    kind: RecordKind,
) -> Result<FieldValue, ValidationError> {
    let id: FieldId = field_name.parse()?;
    validate_field(id, input, kind, Encoding::Utf8)
}

/// Validate a proposed value for a field, measuring text in `encoding`
pub fn validate_field(
    id: FieldId,
    input: &str,
    kind: RecordKind,
    encoding: Encoding,
) -> Result<FieldValue, ValidationError> {
    let field = kind
        .layout()
        .field(id)
        .ok_or(ValidationError::FieldUnavailable {
            field: id.name(),
            kind,
        })?;

    // Text slots may be cleared, numbers and flags need a value
    let input = input.trim();
    if input.is_empty() && !matches!(field.field_type, FieldType::Str(_)) {
        return Err(ValidationError::Empty(id.name()));
    }

    match field.field_type {
        FieldType::Str(width) => validate_text(field, input, width, encoding),
        FieldType::Flag => match input {
            "0" => Ok(FieldValue::Int(0)),
            "1" => Ok(FieldValue::Int(1)),
            _ => Err(ValidationError::NotBoolean {
                field: id.name(),
                value: input.to_string(),
            }),
        },
        field_type => validate_number(field, input, field_type),
    }
}

fn validate_text(
    field: &Field,
    input: &str,
    width: usize,
    encoding: Encoding,
) -> Result<FieldValue, ValidationError> {
    if input.contains('\0') {
        return Err(ValidationError::InvalidText {
            field: field.name(),
            reason: "NUL character",
        });
    }

    let bytes = encode_string(input, encoding).map_err(|_| ValidationError::InvalidText {
        field: field.name(),
        reason: "character not representable in the file's encoding",
    })?;

    if bytes.len() > width {
        return Err(ValidationError::TooLong {
            field: field.name(),
            max: width,
            len: bytes.len(),
        });
    }

    Ok(FieldValue::Text(input.to_string()))
}

fn validate_number(
    field: &Field,
    input: &str,
    field_type: FieldType,
) -> Result<FieldValue, ValidationError> {
    let (min, max) = field_type.range().unwrap_or((0, 0));
    let digits = match input.strip_prefix('-') {
        Some(rest) if min < 0 => rest,
        _ => input,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotNumeric {
            field: field.name(),
            value: input.to_string(),
        });
    }

    let out_of_range = || ValidationError::OutOfRange {
        field: field.name(),
        value: input.to_string(),
        min,
        max,
    };

    // Digit strings too long for i64 are out of range for every slot
    let value: i64 = input.parse().map_err(|_| out_of_range())?;
    if value < min || value > max {
        return Err(out_of_range());
    }

    Ok(FieldValue::Int(value))
}
