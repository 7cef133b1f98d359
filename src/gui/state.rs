//! Application state and the actions the UI dispatches

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use eframe::egui::Modifiers;

use crate::csv::{apply_csv, to_csv};
use crate::field::FieldId;
use crate::io::IoOptions;
use crate::schema::RecordKind;
use crate::sql::{ExportOptions, SqlTable, to_sql_file};
use crate::store::{BatchReport, RecordStore};

/// How the kind of a file is chosen when opening it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenKind {
    /// From the file name, then the file size
    #[default]
    Auto,
    /// Always this kind
    Fixed(RecordKind),
}

impl OpenKind {
    pub fn label(&self) -> &'static str {
        match self {
            OpenKind::Auto => "Auto",
            OpenKind::Fixed(kind) => kind.name(),
        }
    }
}

/// An in-progress inline cell edit
#[derive(Debug, Clone)]
pub struct CellEdit {
    pub row: usize,
    pub field: FieldId,
    pub buffer: String,
    pub focus_requested: bool,
}

/// The batch edit window
#[derive(Debug, Default)]
pub struct BatchDialog {
    pub open: bool,
    pub field: Option<FieldId>,
    pub value: String,
}

pub struct AppState {
    pub store: RecordStore,
    pub selection: BTreeSet<usize>,
    /// Row where the last plain or ctrl click landed, start of shift ranges
    pub anchor: Option<usize>,
    pub editing: Option<CellEdit>,
    pub batch: BatchDialog,
    /// Picture number shown in the toolbar, follows the last clicked row
    pub image_value: String,
    pub open_kind: OpenKind,
    pub export_options: ExportOptions,
    pub status: String,
    pub error_message: Option<String>,
    pub error_dismiss_time: Option<Instant>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            store: RecordStore::new(IoOptions::default()),
            selection: BTreeSet::new(),
            anchor: None,
            editing: None,
            batch: BatchDialog::default(),
            image_value: String::new(),
            open_kind: OpenKind::Auto,
            export_options: ExportOptions::default(),
            status: "No file loaded".to_string(),
            error_message: None,
            error_dismiss_time: None,
        }
    }

    pub fn show_error(&mut self, msg: impl Into<String>) {
        self.error_message = Some(msg.into());
        self.error_dismiss_time = Some(Instant::now() + Duration::from_secs(5));
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
        self.error_dismiss_time = None;
    }

    /// Drop the error toast once its time is up
    pub fn expire_error(&mut self) {
        if self.error_dismiss_time.is_some_and(|t| Instant::now() >= t) {
            self.clear_error();
        }
    }

    pub fn open_file(&mut self, path: &Path) {
        let kind = match self.open_kind {
            OpenKind::Fixed(kind) => kind,
            OpenKind::Auto => {
                let len = std::fs::metadata(path).map(|m| m.len() as usize).unwrap_or(0);
                RecordKind::guess(path, len)
            }
        };

        match self.store.open(path, kind) {
            Ok(()) => {
                self.selection.clear();
                self.anchor = None;
                self.editing = None;
                self.batch.field = None;
                self.image_value.clear();
                self.status = format!(
                    "Loaded: {} ({} {} records)",
                    path.display(),
                    self.store.len(),
                    kind
                );

                let duplicates = self.store.duplicate_codes();
                if !duplicates.is_empty() {
                    let codes: Vec<String> = duplicates.keys().map(|c| c.to_string()).collect();
                    self.show_error(format!("Duplicate avatar codes: {}", codes.join(", ")));
                }
            }
            Err(e) => self.show_error(format!("Failed to open {}: {}", path.display(), e)),
        }
    }

    pub fn save(&mut self) {
        self.commit_edit();
        match self.store.save() {
            Ok(()) => {
                if let Some(path) = self.store.path() {
                    self.status = format!("Saved: {}", path.display());
                }
            }
            Err(e) => self.show_error(format!("Failed to save: {}", e)),
        }
    }

    pub fn save_as(&mut self, path: &Path) {
        self.commit_edit();
        match self.store.save_as(path) {
            Ok(()) => self.status = format!("Saved: {}", path.display()),
            Err(e) => self.show_error(format!("Failed to save: {}", e)),
        }
    }

    pub fn export_sql(&mut self, table: SqlTable, path: &Path) {
        if self.store.is_empty() {
            self.show_error("Nothing to export, open a DAT file first");
            return;
        }

        match to_sql_file(self.store.export_all(), table, path, &self.export_options) {
            Ok(()) => self.status = format!("Exported SQL {}: {}", table, path.display()),
            Err(e) => self.show_error(format!("Failed to export SQL {}: {}", table, e)),
        }
    }

    pub fn export_csv(&mut self, path: &Path) {
        let Some(kind) = self.store.kind() else {
            self.show_error("Nothing to export, open a DAT file first");
            return;
        };

        match to_csv(self.store.export_all(), kind, path) {
            Ok(()) => self.status = format!("Exported CSV: {}", path.display()),
            Err(e) => self.show_error(format!("Failed to export CSV: {}", e)),
        }
    }

    pub fn import_csv(&mut self, path: &Path) {
        self.editing = None;
        match apply_csv(&mut self.store, path) {
            Ok(report) => self.report_batch("CSV import", &report),
            Err(e) => self.show_error(format!("Failed to import CSV: {}", e)),
        }
    }

    /// Start editing a cell, unless the click was on the row already being edited there
    pub fn begin_edit(&mut self, row: usize, field: FieldId) {
        if self
            .editing
            .as_ref()
            .is_some_and(|e| e.row == row && e.field == field)
        {
            return;
        }
        self.commit_edit();

        if let Some(record) = self.store.get(row) {
            if record.contains(field) {
                self.editing = Some(CellEdit {
                    row,
                    field,
                    buffer: record.display(field),
                    focus_requested: false,
                });
            }
        }
    }

    /// Store the in-progress cell edit, if any
    pub fn commit_edit(&mut self) {
        let Some(edit) = self.editing.take() else {
            return;
        };

        match self.store.update(edit.row, edit.field, &edit.buffer) {
            Ok(()) => self.status = format!("Row {}: {} = {}", edit.row, edit.field, edit.buffer.trim()),
            Err(e) => self.show_error(format!("Row {}: {}", edit.row, e)),
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn apply_batch(&mut self) {
        let Some(field) = self.batch.field else {
            self.show_error("Choose a field to edit");
            return;
        };
        if self.selection.is_empty() {
            self.show_error("No rows selected");
            return;
        }

        self.commit_edit();
        let value = self.batch.value.clone();
        let report = self
            .store
            .batch_update(self.selection.iter().copied(), field, &value);
        self.report_batch(&format!("Batch edit {} = {}", field, value.trim()), &report);
    }

    /// Set the picture number of every selected row
    pub fn apply_image(&mut self) {
        if self.selection.is_empty() {
            self.show_error("No rows selected");
            return;
        }

        self.commit_edit();
        let value = self.image_value.clone();
        match self.store.set_image(self.selection.iter().copied(), &value) {
            Ok(report) => self.report_batch(&format!("Image = {}", value.trim()), &report),
            Err(e) => self.show_error(format!("Failed to set image: {}", e)),
        }
    }

    fn report_batch(&mut self, what: &str, report: &BatchReport) {
        self.status = format!(
            "{}: {} rows updated, {} rejected",
            what,
            report.updated.len(),
            report.failed.len()
        );

        if let Some((index, err)) = report.failed.first() {
            let more = report.failed.len() - 1;
            let suffix = if more > 0 {
                format!(" (and {} more)", more)
            } else {
                String::new()
            };
            self.show_error(format!("Row {}: {}{}", index, err, suffix));
        }
    }

    /// Update the selection for a click on `row`
    ///
    /// Plain click selects only that row, ctrl/cmd toggles it, shift extends
    /// from the anchor.
    pub fn click_row(&mut self, row: usize, modifiers: Modifiers) {
        if modifiers.shift {
            let anchor = self.anchor.unwrap_or(row);
            let (from, to) = if anchor <= row { (anchor, row) } else { (row, anchor) };
            if !modifiers.command {
                self.selection.clear();
            }
            self.selection.extend(from..=to);
            return;
        }

        if modifiers.command {
            if !self.selection.remove(&row) {
                self.selection.insert(row);
            }
        } else {
            self.selection.clear();
            self.selection.insert(row);
        }
        self.anchor = Some(row);

        if let (Some(kind), Some(record)) = (self.store.kind(), self.store.get(row)) {
            self.image_value = record.display(kind.image_field());
        }
    }

    pub fn select_all(&mut self) {
        self.selection = (0..self.store.len()).collect();
    }

    /// Window title suffix: file name and unsaved marker
    pub fn title(&self) -> String {
        let name = self
            .store
            .path()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string());
        let dirty = if self.store.is_dirty() { " *" } else { "" };
        format!("{}{}", name, dirty)
    }

    /// Default directory for file dialogs
    pub fn dialog_dir(&self) -> Option<PathBuf> {
        self.store
            .path()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
