//! Record (row) implementation for avatar DAT files

use indexmap::IndexMap;

use crate::field::{FieldId, FieldValue};
use crate::schema::RecordKind;

/// One decoded record of an avatar DAT file
///
/// Besides the typed values of its mapped fields, a record keeps the raw
/// block it was decoded from, so unmapped bytes are written back unchanged.
#[derive(Debug, Clone)]
pub struct Record {
    /// Kind of file this record belongs to
    kind: RecordKind,
    /// Values of the mapped fields, in layout order
    values: IndexMap<FieldId, FieldValue>,
    /// The record block as read from disk
    raw: Vec<u8>,
}

impl Record {
    /// Create a new record of the given kind with default values and a zeroed block
    pub fn new(kind: RecordKind) -> Self {
        let layout = kind.layout();
        let values = layout
            .fields
            .iter()
            .map(|f| (f.id, FieldValue::default_for(f.field_type)))
            .collect();

        Self {
            kind,
            values,
            raw: vec![0; layout.record_size],
        }
    }

    /// Create a record from decoded values and its source block
    pub(crate) fn from_parts(
        kind: RecordKind,
        values: IndexMap<FieldId, FieldValue>,
        raw: Vec<u8>,
    ) -> Self {
        Self { kind, values, raw }
    }

    /// Kind of this record
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Get a value by field id
    pub fn get(&self, id: FieldId) -> Option<&FieldValue> {
        self.values.get(&id)
    }

    /// Get an integer value by field id
    pub fn get_int(&self, id: FieldId) -> Option<i64> {
        self.get(id).and_then(|v| v.as_int())
    }

    /// Get a text value by field id
    pub fn get_str(&self, id: FieldId) -> Option<&str> {
        self.get(id).and_then(|v| v.as_str())
    }

    /// Integer value of a field, zero when absent
    pub fn int_or_zero(&self, id: FieldId) -> i64 {
        self.get_int(id).unwrap_or(0)
    }

    /// Record code (the avatar code)
    pub fn code(&self) -> i64 {
        self.int_or_zero(FieldId::AvatarCode)
    }

    /// Whether the record is listed in the shop
    pub fn is_visible(&self) -> bool {
        self.get_int(FieldId::ShowInShop) == Some(1)
    }

    /// Set a value by field id without validation
    ///
    /// Values that do not fit the field's slot are caught when the record is
    /// encoded. Returns `false` and leaves the record untouched when the field
    /// is not part of this record's layout.
    pub fn set(&mut self, id: FieldId, value: FieldValue) -> bool {
        match self.values.get_mut(&id) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Check if this record has a field
    pub fn contains(&self, id: FieldId) -> bool {
        self.values.contains_key(&id)
    }

    /// Get the number of mapped fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this record has no mapped fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all field-value pairs in layout order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &FieldValue)> {
        self.values.iter()
    }

    /// Text shown in the table cell for a field, empty when the kind lacks it
    pub fn display(&self, id: FieldId) -> String {
        self.get(id).map(|v| v.to_string()).unwrap_or_default()
    }

    /// The record block as read from disk
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Records compare by kind and field values, the source block is not part of equality
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.values == other.values
    }
}

impl Eq for Record {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_layout_fields() {
        let record = Record::new(RecordKind::Head);
        assert_eq!(record.len(), RecordKind::Head.layout().fields.len());
        assert_eq!(record.get_str(FieldId::Name), Some(""));
        assert_eq!(record.get_int(FieldId::Attack), Some(0));
        assert_eq!(record.raw().len(), 644);
    }

    #[test]
    fn test_set_rejects_foreign_field() {
        let mut record = Record::new(RecordKind::ExItem);
        assert!(!record.set(FieldId::Attack, FieldValue::Int(5)));
        assert!(!record.contains(FieldId::Attack));
        assert_eq!(record.display(FieldId::Attack), "");

        assert!(record.set(FieldId::ExNumber, FieldValue::Int(12)));
        assert_eq!(record.display(FieldId::ExNumber), "12");
    }
}
