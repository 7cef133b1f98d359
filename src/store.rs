use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{DatError, Result};
use crate::field::FieldId;
use crate::io::{DatFile, IoOptions, from_file, redecode_text, to_file};
use crate::record::Record;
use crate::schema::RecordKind;
use crate::validate::validate_field;

/// Outcome of an edit applied to several records
///
/// Each index is validated and applied on its own: one rejected row never
/// prevents the others from being updated.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Indices that were updated
    pub updated: Vec<usize>,
    /// Indices that were left unchanged, with the reason
    pub failed: Vec<(usize, DatError)>,
}

impl BatchReport {
    /// Whether every targeted record was updated
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The in-memory record set of the file being edited
///
/// This is a table-like structure: each record is a row, each field of the
/// kind's layout a column. Row order is file order and never changes.
#[derive(Debug, Default)]
pub struct RecordStore {
    /// Loaded file, `None` until the first open/load
    file: Option<DatFile>,
    /// Where the file was read from (and is saved to)
    path: Option<PathBuf>,
    /// Encoding used to read, validate and write text
    options: IoOptions,
    /// Whether there are edits not yet saved
    dirty: bool,
}

impl RecordStore {
    /// Create an empty store with the given I/O options
    pub fn new(options: IoOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Replace the current record set
    pub fn load(&mut self, file: DatFile) {
        self.file = Some(file);
        self.path = None;
        self.dirty = false;
    }

    /// Read a file from disk and make it the current record set
    ///
    /// # Arguments
    /// - `path` - The DAT file to open
    /// - `kind` - The record kind the file holds
    ///
    /// # Errors
    /// Any read or format error. On error the previously loaded records are kept.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, kind: RecordKind) -> Result<()> {
        let path = path.as_ref();
        let file = from_file(path, kind, &self.options)?;

        info!(path = %path.display(), %kind, records = file.len(), "opened DAT file");

        self.load(file);
        self.path = Some(path.to_path_buf());

        let duplicates = self.duplicate_codes();
        if !duplicates.is_empty() {
            warn!(?duplicates, "avatar codes used by more than one record");
        }

        Ok(())
    }

    /// Write the records back to the file they were opened from
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(DatError::NoPath)?;
        self.save_as(path)
    }

    /// Write the records to `path`, which becomes the current file path
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = self.file.as_ref().ok_or(DatError::NothingLoaded)?;

        to_file(file, path, &self.options)?;

        info!(path = %path.display(), records = file.len(), "saved DAT file");

        self.path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// Get the I/O options
    pub fn options(&self) -> &IoOptions {
        &self.options
    }

    /// Replace the I/O options, affecting the next open, edit and save
    ///
    /// When a file is loaded and the encoding changes, its untouched text is
    /// re-read from the original bytes in the new encoding, so a later save
    /// does not rewrite names and descriptions nobody edited.
    pub fn set_options(&mut self, options: IoOptions) {
        if let Some(file) = self.file.as_mut() {
            let redecoded = redecode_text(file, self.options.encoding, options.encoding);
            if redecoded > 0 {
                info!(
                    encoding = options.encoding.label(),
                    redecoded, "re-read text in new encoding"
                );
            }
        }
        self.options = options;
    }

    /// Path of the current file, if it came from or was saved to disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Kind of the loaded records
    pub fn kind(&self) -> Option<RecordKind> {
        self.file.as_ref().map(|f| f.kind)
    }

    /// Whether there are unsaved edits
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether a record set is loaded
    pub fn is_loaded(&self) -> bool {
        self.file.is_some()
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.export_all().len()
    }

    /// Check if there are no records
    pub fn is_empty(&self) -> bool {
        self.export_all().is_empty()
    }

    /// Get a record by index
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.export_all().get(index)
    }

    /// All records in file order, for encoding or export
    pub fn export_all(&self) -> &[Record] {
        self.file.as_ref().map(|f| f.records.as_slice()).unwrap_or(&[])
    }

    /// The loaded file
    pub fn file(&self) -> Option<&DatFile> {
        self.file.as_ref()
    }

    /// Validate `value` and store it in one record
    ///
    /// # Arguments
    /// - `index` - The record to update
    /// - `field` - The field to update
    /// - `value` - The text entered by the user
    ///
    /// # Errors
    /// - `DatError::EntryIndexOutOfBounds` if no record has this index
    /// - `DatError::Validation` if the value breaks a field rule
    ///
    /// In both cases the record is left unchanged.
    pub fn update(&mut self, index: usize, field: FieldId, value: &str) -> Result<()> {
        let encoding = self.options.encoding;
        let file = self.file.as_mut().ok_or(DatError::NothingLoaded)?;
        let len = file.records.len();
        let record = file
            .records
            .get_mut(index)
            .ok_or(DatError::EntryIndexOutOfBounds { index, len })?;

        let value = validate_field(field, value, record.kind(), encoding)?;
        if record.get(field) != Some(&value) {
            record.set(field, value);
            self.dirty = true;
        }

        Ok(())
    }

    /// Apply the same edit to several records
    ///
    /// Indices are processed in ascending order and each one independently;
    /// see [`BatchReport`].
    pub fn batch_update<I>(&mut self, indices: I, field: FieldId, value: &str) -> BatchReport
    where
        I: IntoIterator<Item = usize>,
    {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();

        let mut report = BatchReport::default();
        for index in indices {
            match self.update(index, field, value) {
                Ok(()) => report.updated.push(index),
                Err(err) => report.failed.push((index, err)),
            }
        }

        info!(
            field = %field,
            updated = report.updated.len(),
            failed = report.failed.len(),
            "batch edit"
        );

        report
    }

    /// Set the picture number of several records
    ///
    /// Normal kinds store it in `image_number`, ex-items in `ex_number`.
    pub fn set_image<I>(&mut self, indices: I, value: &str) -> Result<BatchReport>
    where
        I: IntoIterator<Item = usize>,
    {
        let kind = self.kind().ok_or(DatError::NothingLoaded)?;
        Ok(self.batch_update(indices, kind.image_field(), value))
    }

    /// Avatar codes that appear on more than one record, with their indices
    pub fn duplicate_codes(&self) -> BTreeMap<i64, Vec<usize>> {
        let mut by_code: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (index, record) in self.export_all().iter().enumerate() {
            by_code.entry(record.code()).or_default().push(index);
        }

        by_code.retain(|_, indices| indices.len() > 1);
        by_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::field::FieldValue;

    fn store_with(kind: RecordKind, count: usize) -> RecordStore {
        let records = (0..count)
            .map(|i| {
                let mut record = Record::new(kind);
                record.set(FieldId::AvatarCode, FieldValue::Int(100 + i as i64));
                record
            })
            .collect();

        let mut store = RecordStore::new(IoOptions::default());
        store.load(DatFile::new(kind, records));
        store
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("avatar-dat-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_update_valid_value() {
        let mut store = store_with(RecordKind::Body, 2);
        store.update(1, FieldId::Name, "Cowboy Hat").unwrap();

        assert_eq!(store.get(1).unwrap().get_str(FieldId::Name), Some("Cowboy Hat"));
        assert_eq!(store.get(0).unwrap().get_str(FieldId::Name), Some(""));
        assert!(store.is_dirty());
    }

    #[test]
    fn test_rejected_update_keeps_old_value() {
        let mut store = store_with(RecordKind::Body, 1);
        store.update(0, FieldId::Name, "Old").unwrap();

        let err = store.update(0, FieldId::Name, &"x".repeat(20)).unwrap_err();
        assert!(matches!(
            err,
            DatError::Validation(ValidationError::TooLong { max: 19, len: 20, .. })
        ));
        assert_eq!(store.get(0).unwrap().get_str(FieldId::Name), Some("Old"));

        assert!(store.update(0, FieldId::Defense, "12a").is_err());
        assert_eq!(store.get(0).unwrap().get_int(FieldId::Defense), Some(0));

        assert!(matches!(
            store.update(5, FieldId::Defense, "1"),
            Err(DatError::EntryIndexOutOfBounds { index: 5, len: 1 })
        ));
    }

    #[test]
    fn test_batch_update_selected_rows() {
        let mut store = store_with(RecordKind::Body, 5);
        let report = store.batch_update([4, 0, 2], FieldId::Attack, "50");

        assert!(report.is_complete());
        assert_eq!(report.updated, vec![0, 2, 4]);
        for (index, record) in store.export_all().iter().enumerate() {
            let expected = if index % 2 == 0 { 50 } else { 0 };
            assert_eq!(record.get_int(FieldId::Attack), Some(expected));
        }
    }

    #[test]
    fn test_batch_update_is_per_row() {
        let mut store = store_with(RecordKind::Head, 3);
        let report = store.batch_update([0, 2, 9], FieldId::Popularity, "7");

        assert_eq!(report.updated, vec![0, 2]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 9);
        assert_eq!(store.get(2).unwrap().get_int(FieldId::Popularity), Some(7));

        let report = store.batch_update([0, 1], FieldId::Popularity, "seven");
        assert_eq!(report.failed.len(), 2);
        assert_eq!(store.get(0).unwrap().get_int(FieldId::Popularity), Some(7));
    }

    #[test]
    fn test_set_image_uses_kind_field() {
        let mut store = store_with(RecordKind::ExItem, 2);
        let report = store.set_image([1], "321").unwrap();
        assert!(report.is_complete());
        assert_eq!(store.get(1).unwrap().get_int(FieldId::ExNumber), Some(321));

        let mut store = store_with(RecordKind::Body, 2);
        store.set_image([0, 1], "12").unwrap();
        assert_eq!(store.get(0).unwrap().get_int(FieldId::ImageNumber), Some(12));
    }

    #[test]
    fn test_duplicate_codes() {
        let mut store = store_with(RecordKind::Flag, 4);
        assert!(store.duplicate_codes().is_empty());

        store.update(3, FieldId::AvatarCode, "100").unwrap();
        let duplicates = store.duplicate_codes();
        assert_eq!(duplicates.get(&100), Some(&vec![0, 3]));
    }

    #[test]
    fn test_failed_open_keeps_previous_records() {
        let mut store = store_with(RecordKind::Body, 2);
        let path = temp_path("truncated.dat");
        std::fs::write(&path, vec![0u8; 4 + 100]).unwrap();

        let err = store.open(&path, RecordKind::Body).unwrap_err();
        assert!(err.is_format_error());
        assert_eq!(store.len(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_clear_description() {
        let mut store = store_with(RecordKind::ExItem, 1);
        store.update(0, FieldId::Description, "Limited edition").unwrap();
        store.update(0, FieldId::Description, "").unwrap();

        assert_eq!(store.get(0).unwrap().get_str(FieldId::Description), Some(""));
        assert!(matches!(
            store.update(0, FieldId::PriceWeeklyGold, ""),
            Err(DatError::Validation(ValidationError::Empty(_)))
        ));
    }

    #[test]
    fn test_encoding_switch_keeps_untouched_text() {
        let path = temp_path("korean-glass.dat");
        let mut record = Record::new(RecordKind::Glass);
        record.set(FieldId::Name, FieldValue::Text("선글라스".to_string()));
        let mut korean = RecordStore::new(IoOptions::korean());
        korean.load(DatFile::new(RecordKind::Glass, vec![record]));
        korean.save_as(&path).unwrap();
        let original = std::fs::read(&path).unwrap();

        let mut store = RecordStore::new(IoOptions::korean());
        store.open(&path, RecordKind::Glass).unwrap();
        store.set_options(IoOptions::default());
        store.update(0, FieldId::Attack, "9").unwrap();
        store.save().unwrap();

        let saved = std::fs::read(&path).unwrap();
        let name = 4 + 12..4 + 12 + 19;
        assert_eq!(saved[name.clone()], original[name]);
        assert_eq!(saved[4 + 108], 9);

        store.set_options(IoOptions::korean());
        assert_eq!(store.get(0).unwrap().get_str(FieldId::Name), Some("선글라스"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_encoding_switch_keeps_edited_text() {
        let mut store = store_with(RecordKind::Body, 1);
        store.update(0, FieldId::Name, "Hat").unwrap();
        store.set_options(IoOptions::korean());
        assert_eq!(store.get(0).unwrap().get_str(FieldId::Name), Some("Hat"));
    }

    #[test]
    fn test_save_and_reopen() {
        let mut store = store_with(RecordKind::Glass, 3);
        store.update(2, FieldId::Name, "Monocle").unwrap();
        assert!(matches!(store.save(), Err(DatError::NoPath)));

        let path = temp_path("glass.dat");
        store.save_as(&path).unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.path(), Some(path.as_path()));

        let mut reopened = RecordStore::new(IoOptions::default());
        reopened.open(&path, RecordKind::Glass).unwrap();
        assert_eq!(reopened.export_all(), store.export_all());
        assert_eq!(std::fs::read(&path).unwrap().len(), 4 + 3 * 644);

        std::fs::remove_file(&path).unwrap();
    }
}
