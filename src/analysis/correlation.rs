//! Pearson product-moment correlation between study hours and GPA.

use statrs::statistics::Statistics;

use super::error::AnalysisError;
use super::schema::{NumericColumns, GPA, STUDY_HOURS};
use super::{two_sided_p_value, StatResult};

/// Correlate the two resolved columns over pairwise-complete rows.
pub fn correlate(columns: &NumericColumns) -> Result<StatResult, AnalysisError> {
    let (hours, gpa): (Vec<f64>, Vec<f64>) = columns.complete_pairs().into_iter().unzip();
    let n = hours.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientData { pairs: n });
    }
    if is_constant(&hours) {
        return Err(AnalysisError::ConstantInput {
            column: STUDY_HOURS.to_string(),
        });
    }
    if is_constant(&gpa) {
        return Err(AnalysisError::ConstantInput {
            column: GPA.to_string(),
        });
    }

    // Spread was checked above, so no r here means non-finite input.
    let r = pearson_r(&hours, &gpa).ok_or_else(|| AnalysisError::NonFinite {
        quantity: "correlation coefficient".to_string(),
    })?;
    let p_value = correlation_p_value(r, n)?;
    Ok(StatResult {
        statistic: r,
        p_value,
    })
}

/// Sample correlation coefficient. `None` with fewer than two points, a
/// length mismatch, a sample without spread, or non-finite values.
pub fn pearson_r(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    // r is scale invariant; unit-scaled inputs keep the sums of squares finite.
    let x = unit_scaled(x)?;
    let y = unit_scaled(y)?;
    let (x, y) = (x.as_slice(), y.as_slice());
    let r = x.covariance(y) / (x.std_dev() * y.std_dev());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Divide by the largest magnitude; `None` for all-zero or non-finite data.
fn unit_scaled(values: &[f64]) -> Option<Vec<f64>> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let scale = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| v / scale).collect())
}

/// Two-sided p-value for H0: r = 0, from a t distribution with n-2 df.
pub fn correlation_p_value(r: f64, n: usize) -> Result<f64, AnalysisError> {
    // With two points the line is always perfect; nothing is testable.
    if n <= 2 {
        return Ok(1.0);
    }
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    two_sided_p_value(t, df)
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}
