//! Main application

use eframe::egui::{self, RichText};

use crate::gui::state::{AppState, OpenKind};
use crate::gui::table::RecordTable;
use crate::gui::widgets::{dat_dialog, error_toast, export_dialog};
use crate::io::Encoding;
use crate::schema::RecordKind;
use crate::sql::SqlTable;

pub struct AvatarApp {
    state: AppState,
    /// Last title sent to the viewport
    title: String,
}

impl AvatarApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            state: AppState::new(),
            title: String::new(),
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let state = &mut self.state;

        ui.horizontal(|ui| {
            if ui.button("Open DAT").clicked() {
                if let Some(path) = dat_dialog(state.dialog_dir()).pick_file() {
                    state.open_file(&path);
                }
            }

            egui::ComboBox::from_id_salt("open_kind")
                .selected_text(state.open_kind.label())
                .width(80.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut state.open_kind, OpenKind::Auto, "Auto");
                    for kind in RecordKind::ALL {
                        ui.selectable_value(&mut state.open_kind, OpenKind::Fixed(kind), kind.name());
                    }
                });

            let mut encoding = state.store.options().encoding;
            egui::ComboBox::from_id_salt("encoding")
                .selected_text(encoding.label())
                .width(100.0)
                .show_ui(ui, |ui| {
                    for option in Encoding::ALL {
                        ui.selectable_value(&mut encoding, option, option.label());
                    }
                });
            if encoding != state.store.options().encoding {
                let mut options = state.store.options().clone();
                options.encoding = encoding;
                state.store.set_options(options);
            }

            ui.separator();

            let loaded = state.store.is_loaded();

            if ui.add_enabled(loaded, egui::Button::new("Save")).clicked() {
                if state.store.path().is_some() {
                    state.save();
                } else if let Some(path) = dat_dialog(state.dialog_dir()).save_file() {
                    state.save_as(&path);
                }
            }

            if ui.add_enabled(loaded, egui::Button::new("Save As...")).clicked() {
                if let Some(path) = dat_dialog(state.dialog_dir()).save_file() {
                    state.save_as(&path);
                }
            }

            ui.separator();

            for (table, name) in [(SqlTable::Menu, "menu.sql"), (SqlTable::Item, "item.sql")] {
                let label = format!("Export SQL {}", table);
                if ui.add_enabled(loaded, egui::Button::new(label)).clicked() {
                    if let Some(path) = export_dialog(state.dialog_dir(), name, "sql").save_file() {
                        state.export_sql(table, &path);
                    }
                }
            }

            ui.menu_button("CSV", |ui| {
                if ui.add_enabled(loaded, egui::Button::new("Export CSV...")).clicked() {
                    if let Some(path) = export_dialog(state.dialog_dir(), "records.csv", "csv").save_file() {
                        state.export_csv(&path);
                    }
                    ui.close_menu();
                }
                if ui.add_enabled(loaded, egui::Button::new("Import CSV...")).clicked() {
                    if let Some(path) = export_dialog(state.dialog_dir(), "records.csv", "csv").pick_file() {
                        state.import_csv(&path);
                    }
                    ui.close_menu();
                }
            });

            ui.separator();

            let has_selection = loaded && !state.selection.is_empty();
            ui.label("Image #");
            let response = ui.add_enabled(
                has_selection,
                egui::TextEdit::singleline(&mut state.image_value).desired_width(60.0),
            );
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.add_enabled(has_selection, egui::Button::new("Set")).clicked() || entered {
                state.apply_image();
            }

            ui.separator();

            let batch_label = format!("Batch edit ({})", state.selection.len());
            if ui
                .add_enabled(has_selection, egui::Button::new(batch_label))
                .clicked()
            {
                state.batch.open = true;
            }
            if ui.add_enabled(loaded, egui::Button::new("Select all")).clicked() {
                state.select_all();
            }
        });
    }

    fn batch_window(&mut self, ctx: &egui::Context) {
        let state = &mut self.state;
        let Some(kind) = state.store.kind() else {
            return;
        };

        let mut open = state.batch.open;
        let mut apply = false;

        egui::Window::new("Batch edit")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!("{} selected rows", state.selection.len()));
                ui.add_space(6.0);

                egui::Grid::new("batch_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Field");
                    let selected = state.batch.field.map(|f| f.label()).unwrap_or("Choose...");
                    egui::ComboBox::from_id_salt("batch_field")
                        .selected_text(selected)
                        .width(180.0)
                        .show_ui(ui, |ui| {
                            for id in kind.layout().field_ids() {
                                ui.selectable_value(&mut state.batch.field, Some(id), id.label());
                            }
                        });
                    ui.end_row();

                    ui.label("Value");
                    let response = ui.text_edit_singleline(&mut state.batch.value);
                    if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        apply = true;
                    }
                    ui.end_row();
                });

                ui.add_space(6.0);
                if ui.button("Apply to selected").clicked() {
                    apply = true;
                }
            });

        if apply {
            state.apply_batch();
        }
        state.batch.open = open;
    }
}

impl eframe::App for AvatarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.expire_error();
        if self.state.error_dismiss_time.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        let title = format!("Avatar DAT Editor - {}", self.state.title());
        if title != self.title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.title = title;
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.toolbar(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(error) = self.state.error_message.clone() {
                    if error_toast(ui, &error) {
                        self.state.clear_error();
                    }
                } else {
                    ui.label(&self.state.status);
                    if self.state.store.is_dirty() {
                        ui.separator();
                        ui.label(RichText::new("unsaved changes").italics());
                    }
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::horizontal().show(ui, |ui| {
                RecordTable::show(ui, &mut self.state);
            });
        });

        self.batch_window(ctx);
    }
}
