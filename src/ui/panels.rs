use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::analysis::groups::StudyGroup;
use crate::analysis::{Analysis, StatResult};
use crate::data::model::RawTable;
use crate::state::AppState;
use crate::ui::plot;

const SUCCESS_FG: Color32 = Color32::from_rgb(21, 87, 36);
const SUCCESS_BG: Color32 = Color32::from_rgb(212, 237, 218);
const WARNING_FG: Color32 = Color32::from_rgb(133, 100, 4);
const WARNING_BG: Color32 = Color32::from_rgb(255, 243, 205);
const ERROR_FG: Color32 = Color32::from_rgb(114, 28, 36);
const ERROR_BG: Color32 = Color32::from_rgb(248, 215, 218);

/// Rows shown in the raw data preview before it scrolls.
const PREVIEW_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.analysis.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export report…"))
                .clicked()
            {
                export_report_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(path), Some(raw)) = (&state.source, &state.raw) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(format!("{name}: {} rows, {} columns", raw.len(), raw.columns.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(msg);
        }
    });
}

// ---------------------------------------------------------------------------
// Central report
// ---------------------------------------------------------------------------

/// Render the whole dashboard page.
pub fn report(ui: &mut Ui, state: &AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("📊 Study Hours vs. GPA Dashboard");
            ui.label(
                "Open an Excel file with columns like `Name`, `Age`, `Study Hours`, and `GPA`. \
                 We'll visualize study behavior and run basic statistics.",
            );
            ui.add_space(8.0);

            if let Some(err) = &state.error {
                badge(ui, ERROR_FG, ERROR_BG, &err.user_message());
                return;
            }

            let (Some(raw), Some(analysis)) = (&state.raw, &state.analysis) else {
                ui.label("File → Open… to load a spreadsheet.");
                return;
            };

            ui.heading("📋 Raw Data Preview");
            ui.push_id("raw_preview", |ui: &mut Ui| raw_preview(ui, raw));
            ui.add_space(12.0);

            ui.heading("📈 Summary Statistics");
            ui.push_id("summary", |ui: &mut Ui| summary_table(ui, analysis));
            ui.add_space(12.0);

            ui.heading("📊 Visualizations");
            ui.columns(2, |cols: &mut [Ui]| {
                plot::histogram_plot(
                    &mut cols[0],
                    "hours_hist",
                    "Distribution of Study Hours",
                    &analysis.charts.hours_histogram,
                    Color32::from_rgb(31, 119, 180),
                );
                plot::histogram_plot(
                    &mut cols[1],
                    "gpa_hist",
                    "Distribution of GPA",
                    &analysis.charts.gpa_histogram,
                    Color32::from_rgb(255, 165, 0),
                );
            });
            plot::scatter_plot(ui, &analysis.charts, state.hue_map.as_ref());
            ui.add_space(12.0);

            ui.heading("📌 Correlation Analysis");
            plot::regression_plot(ui, &analysis.charts);
            correlation_report(ui, analysis);
            ui.add_space(12.0);

            ui.heading("📉 Hypothesis Test (Study Hours Groups)");
            plot::group_box_plot(ui, &analysis.charts);
            t_test_report(ui, analysis);
            ui.add_space(12.0);

            ui.heading("📝 Limitations");
            for line in [
                "Small sample size can affect significance",
                "Self-reported data may contain bias",
                "Correlation ≠ causation",
            ] {
                ui.label(format!("• {line}"));
            }
        });
}

fn raw_preview(ui: &mut Ui, raw: &RawTable) {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(PREVIEW_HEIGHT)
        .columns(Column::auto().at_least(60.0), raw.columns.len())
        .header(20.0, |mut header| {
            for name in &raw.columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, raw.len(), |mut row| {
                let cells = &raw.rows[row.index()];
                for cell in cells {
                    row.col(|ui: &mut Ui| {
                        ui.label(cell.to_string());
                    });
                }
            });
        });
}

fn summary_table(ui: &mut Ui, analysis: &Analysis) {
    let fmt = |v: Option<f64>| v.map(|v| format!("{v:.6}")).unwrap_or_else(|| "NaN".into());
    TableBuilder::new(ui)
        .striped(true)
        .columns(Column::auto().at_least(90.0), 3)
        .header(20.0, |mut header| {
            for name in ["", "study_hours", "gpa"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(name);
                });
            }
        })
        .body(|mut body| {
            for (label, hours, gpa) in analysis.summary.rows() {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.strong(label);
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(fmt(hours));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(fmt(gpa));
                    });
                });
            }
        });
}

fn correlation_report(ui: &mut Ui, analysis: &Analysis) {
    match &analysis.correlation {
        Ok(result) => {
            let StatResult { statistic, p_value } = result;
            ui.label(RichText::new(format!("Pearson Correlation Coefficient: {statistic:.4}")).strong());
            ui.label(RichText::new(format!("p-value: {p_value:.6}")).strong());
            if result.is_significant() {
                badge(ui, SUCCESS_FG, SUCCESS_BG, "✅ Statistically significant relationship.");
            } else {
                badge(ui, WARNING_FG, WARNING_BG, "⚠️ No statistically significant relationship.");
            }
        }
        Err(e) => badge(ui, WARNING_FG, WARNING_BG, &e.user_message()),
    }
}

fn t_test_report(ui: &mut Ui, analysis: &Analysis) {
    let grouped = &analysis.groups.grouped;
    ui.label(
        StudyGroup::ALL
            .iter()
            .map(|&g| format!("{}: n = {}", g.label(), grouped.sample(g).len()))
            .collect::<Vec<_>>()
            .join("   "),
    );

    match &analysis.groups.test {
        Ok(result) => {
            ui.label(RichText::new("T-test between '<5h' and '>10h' groups").strong());
            ui.label(format!(
                "t-statistic: {:.4}, p-value: {:.6}",
                result.statistic, result.p_value
            ));
            if result.is_significant() {
                badge(
                    ui,
                    SUCCESS_FG,
                    SUCCESS_BG,
                    "✅ Significant difference in GPA between the two groups.",
                );
            } else {
                badge(ui, WARNING_FG, WARNING_BG, "⚠️ No significant difference found.");
            }
        }
        Err(e) => badge(ui, WARNING_FG, WARNING_BG, &e.user_message()),
    }
}

/// A coloured callout box.
fn badge(ui: &mut Ui, fg: Color32, bg: Color32, text: &str) {
    egui::Frame::group(ui.style())
        .fill(bg)
        .inner_margin(8.0)
        .show(ui, |ui: &mut Ui| {
            ui.set_width(ui.available_width());
            ui.colored_label(fg, text);
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open student data")
        .add_filter("Supported files", &["xlsx", "csv", "json", "parquet", "pq"])
        .add_filter("Excel", &["xlsx"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load(&path);
    }
}

fn export_report_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export analysis report")
        .set_file_name("study_report.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        state.status_message = Some(match state.export_report(&path) {
            Ok(()) => format!("Report saved to {}", path.display()),
            Err(e) => {
                log::error!("Failed to export report: {e:#}");
                format!("Export failed: {e:#}")
            }
        });
    }
}
