use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use crate::error::{DatError, Result};
use crate::field::FieldId;
use crate::record::Record;
use crate::schema::RecordKind;
use crate::store::{BatchReport, RecordStore};

/// Name of the CSV column holding the record index
pub const INDEX_COLUMN: &str = "index";

/// Write records to a CSV file for spreadsheet editing
///
/// The header row is `index` followed by the field names of the kind's
/// layout, e.g. `index,avatar_code,image_number,name,...`.
///
/// # Arguments
/// - `records` - The records to export, in file order
/// - `kind` - The kind whose layout decides the columns
/// - `path` - The path to the CSV file to write
///
/// # Returns
/// Ok(()) if the export was successful, or an error if the file could not be written
pub fn to_csv<P: AsRef<Path>>(records: &[Record], kind: RecordKind, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let writer = BufWriter::new(file);
    let mut csv_writer = csv::Writer::from_writer(writer);
    let fields: Vec<FieldId> = kind.layout().field_ids().collect();

    let mut header = vec![INDEX_COLUMN.to_string()];
    header.extend(fields.iter().map(|id| id.name().to_string()));
    csv_writer.write_record(&header)?;

    for (index, record) in records.iter().enumerate() {
        let mut row = vec![index.to_string()];
        row.extend(fields.iter().map(|id| record.display(*id)));
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    info!(path = %path.as_ref().display(), records = records.len(), "exported CSV");
    Ok(())
}

/// Apply the cells of a CSV file (as written by [`to_csv`]) to the store
///
/// Rows are matched by their `index` column. Every cell whose text differs
/// from the record's current value goes through [`RecordStore::update`], so
/// the usual field rules apply and each cell succeeds or fails on its own.
///
/// # Errors
/// - `DatError::NothingLoaded` if the store is empty
/// - `DatError::CsvError` if the header has no `index` column or names an unknown field,
///   or if a row is malformed or has an invalid index
///
/// The file is fully read before any cell is applied, so on error the store is untouched.
///
/// # Returns
/// A report listing updated record indices and per-cell failures
pub fn apply_csv<P: AsRef<Path>>(store: &mut RecordStore, path: P) -> Result<BatchReport> {
    let kind = store.kind().ok_or(DatError::NothingLoaded)?;
    let file = File::open(path.as_ref())?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers = csv_reader.headers()?.clone();
    let mut index_column = None;
    let mut columns: Vec<(usize, FieldId)> = Vec::new();

    for (i, name) in headers.iter().enumerate() {
        if name == INDEX_COLUMN {
            index_column = Some(i);
            continue;
        }

        let id: FieldId = name
            .parse()
            .map_err(|_| DatError::CsvError(format!("Unknown column: {}", name)))?;
        if !kind.layout().contains(id) {
            return Err(DatError::CsvError(format!(
                "Column {} does not exist in {} files",
                name, kind
            )));
        }
        columns.push((i, id));
    }

    let index_column = index_column
        .ok_or_else(|| DatError::CsvError(format!("Missing {} column", INDEX_COLUMN)))?;

    // Parse the whole file before touching the store
    let mut rows = Vec::new();
    for (line, result) in csv_reader.records().enumerate() {
        let row = result?;
        let raw_index = row.get(index_column).unwrap_or("").trim();
        let index: usize = raw_index.parse().map_err(|_| {
            DatError::CsvError(format!("Row {}: invalid index {:?}", line + 2, raw_index))
        })?;
        rows.push((index, row));
    }

    let mut report = BatchReport::default();
    for (index, row) in rows {
        let mut changed = false;
        for (column, id) in &columns {
            let value = row.get(*column).unwrap_or("");
            let unchanged = store
                .get(index)
                .is_some_and(|record| record.display(*id) == value);
            if unchanged {
                continue;
            }

            match store.update(index, *id, value) {
                Ok(()) => changed = true,
                Err(err) => report.failed.push((index, err)),
            }
        }

        if changed {
            report.updated.push(index);
        }
    }

    info!(
        path = %path.as_ref().display(),
        updated = report.updated.len(),
        failed = report.failed.len(),
        "applied CSV"
    );
    Ok(report)
}
