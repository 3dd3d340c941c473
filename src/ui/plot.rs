use std::collections::BTreeMap;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points,
};

use crate::analysis::charts::{ChartSet, Histogram};
use crate::color::{group_color, HueMap};

const PLOT_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Histograms
// ---------------------------------------------------------------------------

/// Bars plus the KDE overlay.
pub fn histogram_plot(ui: &mut Ui, id: &str, title: &str, hist: &Histogram, color: Color32) {
    ui.label(RichText::new(title).strong());

    let bars: Vec<Bar> = hist
        .bins
        .iter()
        .map(|bin| Bar::new(bin.center(), bin.count as f64).width(bin.width()))
        .collect();

    Plot::new(id)
        .height(PLOT_HEIGHT)
        .y_axis_label("Count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(color.gamma_multiply(0.6)));
            if !hist.kde.is_empty() {
                let points: PlotPoints = hist.kde.iter().copied().collect();
                plot_ui.line(Line::new(points).color(color).width(2.0));
            }
        });
}

// ---------------------------------------------------------------------------
// Scatter (coloured by age)
// ---------------------------------------------------------------------------

pub fn scatter_plot(ui: &mut Ui, charts: &ChartSet, hue_map: Option<&HueMap>) {
    ui.label(RichText::new("Study Hours vs GPA").strong());

    // One series per colour keeps the draw calls down.
    let mut series: BTreeMap<[u8; 4], (Color32, Vec<[f64; 2]>)> = BTreeMap::new();
    for p in &charts.scatter {
        let color = match (hue_map, &p.hue) {
            (Some(map), Some(hue)) => map.color_for(hue),
            _ => Color32::from_rgb(31, 119, 180),
        };
        series
            .entry(color.to_array())
            .or_insert_with(|| (color, Vec::new()))
            .1
            .push([p.x, p.y]);
    }

    Plot::new("scatter")
        .height(PLOT_HEIGHT)
        .x_axis_label("study_hours")
        .y_axis_label("gpa")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (color, points) in series.into_values() {
                let points: PlotPoints = points.into_iter().collect();
                plot_ui.points(Points::new(points).radius(4.0).color(color));
            }
        });

    if let Some(map) = hue_map {
        ui.horizontal_wrapped(|ui: &mut Ui| {
            ui.label("age:");
            for (label, color) in map.legend_entries() {
                ui.colored_label(color, format!("● {label}"));
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Scatter with regression line
// ---------------------------------------------------------------------------

pub fn regression_plot(ui: &mut Ui, charts: &ChartSet) {
    ui.label(RichText::new("Study Hours vs GPA with Regression Line").strong());

    let points: PlotPoints = charts.scatter.iter().map(|p| [p.x, p.y]).collect();

    Plot::new("regression")
        .height(PLOT_HEIGHT)
        .x_axis_label("study_hours")
        .y_axis_label("gpa")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.points(Points::new(points).radius(4.0).color(Color32::BLUE));
            if let Some(line) = &charts.regression {
                let ends: PlotPoints = [line.x_min, line.x_max]
                    .into_iter()
                    .map(|x| [x, line.predict(x)])
                    .collect();
                plot_ui.line(Line::new(ends).color(Color32::RED).width(2.0));
            }
        });
}

// ---------------------------------------------------------------------------
// GPA by study group
// ---------------------------------------------------------------------------

pub fn group_box_plot(ui: &mut Ui, charts: &ChartSet) {
    ui.label(RichText::new("GPA Distribution by Study Hour Groups").strong());

    Plot::new("group_box")
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .y_axis_label("gpa")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for stats in &charts.boxplot {
                // Fixed slot per group so an omitted group leaves a gap.
                let x = stats.group.index() as f64;
                let color = group_color(stats.group);
                let label = stats.group.label();

                let elem = BoxElem::new(
                    x,
                    BoxSpread::new(
                        stats.lower_whisker,
                        stats.q1,
                        stats.median,
                        stats.q3,
                        stats.upper_whisker,
                    ),
                )
                .name(label)
                .fill(color.gamma_multiply(0.8));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(label).color(color));

                if !stats.outliers.is_empty() {
                    let outliers: PlotPoints =
                        stats.outliers.iter().map(|&y| [x, y]).collect();
                    plot_ui.points(Points::new(outliers).radius(3.0).color(color));
                }
            }
        });
}
