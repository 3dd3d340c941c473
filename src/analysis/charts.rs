//! Data behind each chart. Rendering lives in `ui::plot`.

use statrs::statistics::Statistics;

use crate::data::model::CellValue;

use super::groups::{GroupedGpa, StudyGroup};
use super::schema::{NormalizedTable, NumericColumns};
use super::summary::percentile;

/// Points on the KDE curve.
const KDE_POINTS: usize = 200;
/// Upper bound so a single outlier cannot explode the bar count.
const MAX_BINS: usize = 200;

// ---------------------------------------------------------------------------
// Histogram + KDE
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub left: f64,
    pub right: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn center(&self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    /// Gaussian KDE scaled to the bar counts.
    pub kde: Vec<[f64; 2]>,
}

impl Histogram {
    /// Equal-width bins; the count follows numpy's `auto` rule.
    pub fn build(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Histogram::default();
        };

        let range = max - min;
        if range.abs() < 1e-10 {
            // All values are the same
            return Histogram {
                bins: vec![HistogramBin {
                    left: min - 0.5,
                    right: min + 0.5,
                    count: sorted.len(),
                }],
                kde: Vec::new(),
            };
        }

        let num_bins = auto_bin_count(&sorted, range);
        let width = range / num_bins as f64;
        let mut bins: Vec<HistogramBin> = (0..num_bins)
            .map(|i| HistogramBin {
                left: min + i as f64 * width,
                right: if i == num_bins - 1 {
                    max // last bin includes max
                } else {
                    min + (i + 1) as f64 * width
                },
                count: 0,
            })
            .collect();
        for &v in &sorted {
            let idx = (((v - min) / width).floor() as usize).min(num_bins - 1);
            bins[idx].count += 1;
        }

        let kde = gaussian_kde(&sorted, min, max, sorted.len() as f64 * width);
        Histogram { bins, kde }
    }
}

/// Smaller bin width of Sturges and Freedman–Diaconis (Sturges when IQR is 0).
fn auto_bin_count(sorted: &[f64], range: f64) -> usize {
    let n = sorted.len() as f64;
    let sturges = range / (n.log2() + 1.0);
    let iqr = percentile(sorted, 0.75).unwrap_or(0.0) - percentile(sorted, 0.25).unwrap_or(0.0);
    let fd = 2.0 * iqr * n.powf(-1.0 / 3.0);
    let width = if fd > 0.0 { fd.min(sturges) } else { sturges };
    ((range / width).ceil() as usize).clamp(1, MAX_BINS)
}

/// Gaussian kernel density with Scott's bandwidth, evaluated over
/// `[lo, hi]` and multiplied by `scale`.
fn gaussian_kde(sorted: &[f64], lo: f64, hi: f64, scale: f64) -> Vec<[f64; 2]> {
    let n = sorted.len() as f64;
    let std = sorted.iter().std_dev();
    let bandwidth = std * n.powf(-0.2);
    if !bandwidth.is_finite() || bandwidth <= 0.0 {
        return Vec::new();
    }

    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let step = (hi - lo) / (KDE_POINTS - 1) as f64;
    (0..KDE_POINTS)
        .map(|i| {
            let x = lo + i as f64 * step;
            let density: f64 = sorted
                .iter()
                .map(|&xi| (-0.5 * ((x - xi) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            [x, density * scale]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scatter + regression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Value of the `age` column, if the sheet has one.
    pub hue: Option<CellValue>,
}

/// Least-squares line `y = slope·x + intercept` over `[x_min, x_max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionLine {
    pub slope: f64,
    pub intercept: f64,
    pub x_min: f64,
    pub x_max: f64,
}

impl RegressionLine {
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        let n = points.len();
        if n < 2 {
            return None;
        }
        let mx = points.iter().map(|p| p.0).sum::<f64>() / n as f64;
        let my = points.iter().map(|p| p.1).sum::<f64>() / n as f64;
        let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
        let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
        let slope = sxy / sxx;
        if sxx == 0.0 || !slope.is_finite() {
            return None;
        }
        let (x_min, x_max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.0), hi.max(p.0))
            });
        Some(RegressionLine {
            slope,
            intercept: my - slope * mx,
            x_min,
            x_max,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

// ---------------------------------------------------------------------------
// Boxplot
// ---------------------------------------------------------------------------

/// Tukey box: quartiles, 1.5·IQR whiskers, points beyond them.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub group: StudyGroup,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn from_sample(group: StudyGroup, values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = percentile(&sorted, 0.25)?;
        let median = percentile(&sorted, 0.5)?;
        let q3 = percentile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = || sorted.iter().copied().filter(move |v| *v >= lo_fence && *v <= hi_fence);
        Some(BoxStats {
            group,
            q1,
            median,
            q3,
            lower_whisker: inside().fold(q1, f64::min),
            upper_whisker: inside().fold(q3, f64::max),
            outliers: sorted
                .iter()
                .copied()
                .filter(|v| *v < lo_fence || *v > hi_fence)
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// ChartSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSet {
    pub hours_histogram: Histogram,
    pub gpa_histogram: Histogram,
    pub scatter: Vec<ScatterPoint>,
    pub regression: Option<RegressionLine>,
    /// One box per non-empty group, in group order.
    pub boxplot: Vec<BoxStats>,
}

impl ChartSet {
    pub fn build(table: &NormalizedTable, columns: &NumericColumns, grouped: &GroupedGpa) -> Self {
        let hours: Vec<f64> = columns.study_hours.iter().flatten().copied().collect();
        let gpa: Vec<f64> = columns.gpa.iter().flatten().copied().collect();

        let hues = table.hue_values();
        let scatter: Vec<ScatterPoint> = columns
            .study_hours
            .iter()
            .zip(&columns.gpa)
            .enumerate()
            .filter_map(|(row, (h, g))| {
                let hue = hues
                    .as_ref()
                    .map(|values| values[row].clone())
                    .filter(|v| !v.is_missing());
                Some(ScatterPoint {
                    x: (*h)?,
                    y: (*g)?,
                    hue,
                })
            })
            .collect();

        let regression = RegressionLine::fit(&columns.complete_pairs());

        let boxplot = StudyGroup::ALL
            .iter()
            .filter_map(|&g| BoxStats::from_sample(g, grouped.sample(g)))
            .collect();

        ChartSet {
            hours_histogram: Histogram::build(&hours),
            gpa_histogram: Histogram::build(&gpa),
            scatter,
            regression,
            boxplot,
        }
    }
}
