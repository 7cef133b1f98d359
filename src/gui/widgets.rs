//! Reusable UI widgets

use eframe::egui::{self, Color32, RichText, Ui};

/// Error toast notification
pub fn error_toast(ui: &mut Ui, message: &str) -> bool {
    let mut dismissed = false;
    egui::Frame::none()
        .fill(Color32::from_rgb(100, 30, 30))
        .inner_margin(8.0)
        .rounding(4.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("[!]").color(Color32::YELLOW));
                ui.label(RichText::new(message).color(Color32::WHITE));
                dismissed = ui.small_button("x").clicked();
            });
        });
    dismissed
}

/// File dialog for DAT files, starting in `dir` when known
pub fn dat_dialog(dir: Option<std::path::PathBuf>) -> rfd::FileDialog {
    let dialog = rfd::FileDialog::new()
        .add_filter("DAT files", &["dat"])
        .add_filter("All files", &["*"]);
    match dir {
        Some(dir) => dialog.set_directory(dir),
        None => dialog,
    }
}

/// Save dialog for exported text files
pub fn export_dialog(dir: Option<std::path::PathBuf>, name: &str, extension: &str) -> rfd::FileDialog {
    let dialog = rfd::FileDialog::new()
        .add_filter(extension.to_uppercase(), &[extension])
        .set_file_name(name);
    match dir {
        Some(dir) => dialog.set_directory(dir),
        None => dialog,
    }
}
