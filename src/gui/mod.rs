//! egui front-end for editing avatar DAT files
//!
//! Everything here is presentation: opening, editing, saving and exporting
//! all go through [`RecordStore`](crate::store::RecordStore) and the export
//! functions of the library.

mod app;
mod state;
mod table;
mod widgets;

use eframe::egui;

pub use app::AvatarApp;

/// Open the editor window and run until it is closed
pub fn run() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Avatar DAT Editor",
        options,
        Box::new(|cc| Ok(Box::new(AvatarApp::new(cc)))),
    )
}
