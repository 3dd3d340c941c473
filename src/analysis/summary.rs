use serde::Serialize;
use statrs::statistics::Statistics;

use super::schema::NumericColumns;

/// Descriptive statistics of one column. `None` marks an undefined
/// cell (e.g. the std of a single value, or anything of an empty column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// The fixed-shape summary table: columns `study_hours` and `gpa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub study_hours: ColumnSummary,
    pub gpa: ColumnSummary,
}

impl Summary {
    /// Row labels paired with the two columns' cells, in display order.
    pub fn rows(&self) -> [(&'static str, Option<f64>, Option<f64>); 8] {
        let (h, g) = (&self.study_hours, &self.gpa);
        [
            ("count", Some(h.count as f64), Some(g.count as f64)),
            ("mean", h.mean, g.mean),
            ("std", h.std, g.std),
            ("min", h.min, g.min),
            ("25%", h.q25, g.q25),
            ("50%", h.median, g.median),
            ("75%", h.q75, g.q75),
            ("max", h.max, g.max),
        ]
    }
}

pub fn summarize(columns: &NumericColumns) -> Summary {
    Summary {
        study_hours: describe(&columns.study_hours),
        gpa: describe(&columns.gpa),
    }
}

/// Summarise the non-missing values of a column.
pub fn describe(values: &[Option<f64>]) -> ColumnSummary {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let defined = |v: f64| v.is_finite().then_some(v);
    ColumnSummary {
        count: sorted.len(),
        mean: defined(sorted.iter().mean()),
        std: defined(sorted.iter().std_dev()),
        min: sorted.first().copied(),
        q25: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q75: percentile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

/// Linear interpolation between closest ranks at position `(n-1)·q`.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_describe_matches_linear_percentiles() {
        let s = describe(&[Some(4.0), Some(1.0), None, Some(3.0), Some(2.0)]);
        assert_eq!(s.count, 4);
        assert_abs_diff_eq!(s.mean.unwrap(), 2.5);
        assert_abs_diff_eq!(s.std.unwrap(), 1.2909944487358056, epsilon = 1e-12);
        assert_eq!(s.min, Some(1.0));
        assert_abs_diff_eq!(s.q25.unwrap(), 1.75);
        assert_abs_diff_eq!(s.median.unwrap(), 2.5);
        assert_abs_diff_eq!(s.q75.unwrap(), 3.25);
        assert_eq!(s.max, Some(4.0));
    }

    #[test]
    fn test_all_null_column_is_undefined_not_error() {
        let s = describe(&[None, None]);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, None);
        assert_eq!(s.std, None);
        assert_eq!(s.min, None);
        assert_eq!(s.median, None);
        assert_eq!(s.max, None);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let s = describe(&[Some(7.0)]);
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, Some(7.0));
        assert_eq!(s.std, None);
        assert_eq!(s.q75, Some(7.0));
    }

    #[test]
    fn test_summary_rows_are_in_describe_order() {
        let cols = NumericColumns {
            study_hours: vec![Some(2.0), Some(4.0)],
            gpa: vec![Some(3.0), None],
        };
        let rows = summarize(&cols).rows();
        let labels: Vec<_> = rows.iter().map(|r| r.0).collect();
        assert_eq!(
            labels,
            vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        );
        assert_eq!(rows[0].1, Some(2.0));
        assert_eq!(rows[0].2, Some(1.0));
    }
}
