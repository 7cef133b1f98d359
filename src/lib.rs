//! # avatar-dat
//!
//! A Rust library for reading, editing and writing the avatar `.dat` files of
//! an online game client (body, head, glass, flag and ex-item records), and
//! for exporting them as SQL for the game server's `menu` and `item` tables.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use avatar_dat::{ExportOptions, FieldId, IoOptions, RecordKind, RecordStore, SqlTable, to_sql_file};
//!
//! let mut store = RecordStore::new(IoOptions::default());
//! store.open("head.dat", RecordKind::Head).unwrap();
//!
//! // Edits are validated before they reach a record
//! store.update(0, FieldId::Name, "Cowboy Hat").unwrap();
//! let report = store.batch_update([1, 2, 3], FieldId::PriceEternalGold, "2500");
//! println!("{} updated, {} rejected", report.updated.len(), report.failed.len());
//!
//! store.save().unwrap();
//! to_sql_file(store.export_all(), SqlTable::Menu, "menu.sql", &ExportOptions::default()).unwrap();
//! ```
//!
//! ## Features
//!
//! - Bit-exact round trip: unmapped bytes and unchanged fields are written back as read
//! - UTF-8, EUC-KR and Windows-1252 text slots
//! - Per-row batch edits with a report of rejected rows
//! - SQL export for the `menu` and `item` tables, CSV import/export
//! - An egui editor behind the `gui` feature

pub mod csv;
pub mod error;
pub mod field;
pub mod io;
pub mod record;
pub mod schema;
pub mod sql;
pub mod store;
pub mod validate;

#[cfg(feature = "gui")]
pub mod gui;

pub use crate::csv::{apply_csv, to_csv};
pub use crate::error::{DatError, Result, ValidationError};
pub use crate::field::{Field, FieldId, FieldType, FieldValue};
pub use crate::io::{
    DatFile, Encoding, IoOptions, from_buffer, from_file, redecode_text, to_buffer, to_file,
};
pub use crate::record::Record;
pub use crate::schema::{Layout, LayoutFamily, RecordKind, detect_layout};
pub use crate::sql::{ExportOptions, SqlTable, quote_literal, to_sql, to_sql_file, to_sql_text};
pub use crate::store::{BatchReport, RecordStore};
pub use crate::validate::{validate, validate_field};
