//! The record table

use eframe::egui::{self, Key, RichText};
use egui_extras::{Column, TableBuilder};

use crate::field::FieldId;
use crate::gui::state::AppState;

const ROW_HEIGHT: f32 = 22.0;

pub struct RecordTable;

impl RecordTable {
    pub fn show(ui: &mut egui::Ui, state: &mut AppState) {
        let Some(kind) = state.store.kind() else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("Open a DAT file to start").weak());
            });
            return;
        };

        let fields: Vec<FieldId> = kind.layout().field_ids().collect();
        let family = kind.layout().family.label();
        let row_count = state.store.len();
        let modifiers = ui.input(|i| i.modifiers);

        let mut clicked_row = None;
        let mut double_clicked = None;

        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .sense(egui::Sense::click())
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(48.0))
            .column(Column::exact(64.0))
            .columns(Column::initial(100.0).at_least(40.0).clip(true), fields.len())
            .header(ROW_HEIGHT, |mut header| {
                header.col(|ui| {
                    ui.strong("#");
                });
                header.col(|ui| {
                    ui.strong("Type");
                });
                for id in &fields {
                    header.col(|ui| {
                        ui.strong(id.label());
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, row_count, |mut row| {
                    let index = row.index();
                    row.set_selected(state.selection.contains(&index));

                    let (_, response) = row.col(|ui| {
                        ui.label(index.to_string());
                    });
                    if response.clicked() {
                        clicked_row = Some(index);
                    }

                    let (_, response) = row.col(|ui| {
                        ui.label(family);
                    });
                    if response.clicked() {
                        clicked_row = Some(index);
                    }

                    for id in &fields {
                        let editing_here = state
                            .editing
                            .as_ref()
                            .is_some_and(|e| e.row == index && e.field == *id);

                        let (_, response) = row.col(|ui| {
                            if editing_here {
                                Self::edit_cell(ui, state);
                            } else if let Some(record) = state.store.get(index) {
                                ui.label(record.display(*id));
                            }
                        });

                        if response.double_clicked() {
                            double_clicked = Some((index, *id));
                        } else if response.clicked() {
                            clicked_row = Some(index);
                        }
                    }
                });
            });

        if let Some(index) = clicked_row {
            state.click_row(index, modifiers);
        }
        if let Some((index, id)) = double_clicked {
            state.begin_edit(index, id);
        }
    }

    /// Inline editor: Enter or focus loss commits, Escape cancels
    fn edit_cell(ui: &mut egui::Ui, state: &mut AppState) {
        let Some(edit) = state.editing.as_mut() else {
            return;
        };

        let response = ui.add(
            egui::TextEdit::singleline(&mut edit.buffer).desired_width(f32::INFINITY),
        );
        if !edit.focus_requested {
            response.request_focus();
            edit.focus_requested = true;
        }

        if response.lost_focus() {
            if ui.input(|i| i.key_pressed(Key::Escape)) {
                state.cancel_edit();
            } else {
                state.commit_edit();
            }
        }
    }
}
