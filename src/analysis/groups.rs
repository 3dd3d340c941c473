//! Study-hour bins and the Welch t-test between the extreme bins.

use serde::Serialize;
use statrs::statistics::Statistics;

use super::error::AnalysisError;
use super::schema::{NumericColumns, GPA};
use super::{two_sided_p_value, StatResult};

/// Right-closed bin edges: (0,5], (5,10], (10,100].
pub const BIN_EDGES: [f64; 4] = [0.0, 5.0, 10.0, 100.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StudyGroup {
    #[serde(rename = "<5h")]
    UnderFive,
    #[serde(rename = "5-10h")]
    FiveToTen,
    #[serde(rename = ">10h")]
    OverTen,
}

impl StudyGroup {
    pub const ALL: [StudyGroup; 3] = [
        StudyGroup::UnderFive,
        StudyGroup::FiveToTen,
        StudyGroup::OverTen,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StudyGroup::UnderFive => "<5h",
            StudyGroup::FiveToTen => "5-10h",
            StudyGroup::OverTen => ">10h",
        }
    }

    /// Bin a study-hour value; values outside (0, 100] have no group.
    pub fn classify(hours: f64) -> Option<StudyGroup> {
        BIN_EDGES
            .windows(2)
            .position(|edge| hours > edge[0] && hours <= edge[1])
            .map(|i| StudyGroup::ALL[i])
    }

    /// Position in [`StudyGroup::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// GPA values partitioned by study group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedGpa {
    /// Group of every row, `None` when unclassified or hours missing.
    pub row_groups: Vec<Option<StudyGroup>>,
    samples: [Vec<f64>; 3],
}

impl GroupedGpa {
    pub fn from_columns(columns: &NumericColumns) -> Self {
        let mut grouped = GroupedGpa::default();
        for (hours, gpa) in columns.study_hours.iter().zip(&columns.gpa) {
            let group = hours.and_then(StudyGroup::classify);
            if let (Some(g), Some(v)) = (group, gpa) {
                grouped.samples[g.index()].push(*v);
            }
            grouped.row_groups.push(group);
        }
        grouped
    }

    /// Non-missing GPA values in a group, in row order.
    pub fn sample(&self, group: StudyGroup) -> &[f64] {
        &self.samples[group.index()]
    }
}

/// Group partition plus the outcome of the `<5h` vs `>10h` test.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupComparison {
    pub grouped: GroupedGpa,
    pub test: Result<StatResult, AnalysisError>,
}

pub fn compare_groups(columns: &NumericColumns) -> GroupComparison {
    let grouped = GroupedGpa::from_columns(columns);
    let test = extreme_groups_test(&grouped);
    GroupComparison { grouped, test }
}

fn extreme_groups_test(grouped: &GroupedGpa) -> Result<StatResult, AnalysisError> {
    for group in [StudyGroup::UnderFive, StudyGroup::OverTen] {
        let size = grouped.sample(group).len();
        if size < 2 {
            return Err(AnalysisError::InsufficientGroupData {
                group: group.label(),
                size,
            });
        }
    }
    welch_t_test(
        grouped.sample(StudyGroup::UnderFive),
        grouped.sample(StudyGroup::OverTen),
    )
}

/// Two-sample t-test without the equal-variance assumption.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<StatResult, AnalysisError> {
    let smallest = a.len().min(b.len());
    if smallest < 2 {
        return Err(AnalysisError::InsufficientData { pairs: smallest });
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let sa = a.variance() / na;
    let sb = b.variance() / nb;
    let se2 = sa + sb;
    if se2 == 0.0 {
        return Err(AnalysisError::ConstantInput {
            column: GPA.to_string(),
        });
    }

    let t = (a.mean() - b.mean()) / se2.sqrt();
    // Welch–Satterthwaite
    let df = se2 * se2 / (sa * sa / (na - 1.0) + sb * sb / (nb - 1.0));
    let p_value = two_sided_p_value(t, df)?;
    Ok(StatResult {
        statistic: t,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn columns(rows: &[(Option<f64>, Option<f64>)]) -> NumericColumns {
        NumericColumns {
            study_hours: rows.iter().map(|r| r.0).collect(),
            gpa: rows.iter().map(|r| r.1).collect(),
        }
    }

    #[test]
    fn test_bin_edges_are_right_closed() {
        assert_eq!(StudyGroup::classify(0.0), None);
        assert_eq!(StudyGroup::classify(0.01), Some(StudyGroup::UnderFive));
        assert_eq!(StudyGroup::classify(5.0), Some(StudyGroup::UnderFive));
        assert_eq!(StudyGroup::classify(5.01), Some(StudyGroup::FiveToTen));
        assert_eq!(StudyGroup::classify(10.0), Some(StudyGroup::FiveToTen));
        assert_eq!(StudyGroup::classify(10.5), Some(StudyGroup::OverTen));
        assert_eq!(StudyGroup::classify(100.0), Some(StudyGroup::OverTen));
        assert_eq!(StudyGroup::classify(100.01), None);
        assert_eq!(StudyGroup::classify(-3.0), None);
    }

    #[test]
    fn test_binning_is_exhaustive_and_exclusive() {
        for i in 1..=10_000 {
            let hours = i as f64 / 100.0;
            let hits = StudyGroup::ALL
                .iter()
                .filter(|g| StudyGroup::classify(hours) == Some(**g))
                .count();
            assert_eq!(hits, 1, "{hours}");
        }
    }

    #[test]
    fn test_partition_drops_missing_gpa() {
        let grouped = GroupedGpa::from_columns(&columns(&[
            (Some(2.0), Some(3.0)),
            (Some(7.0), Some(3.4)),
            (Some(12.0), None),
            (None, Some(2.2)),
            (Some(150.0), Some(4.0)),
            (Some(15.0), Some(3.9)),
        ]));
        assert_eq!(grouped.sample(StudyGroup::UnderFive), &[3.0]);
        assert_eq!(grouped.sample(StudyGroup::FiveToTen), &[3.4]);
        assert_eq!(grouped.sample(StudyGroup::OverTen), &[3.9]);
        assert_eq!(
            grouped.row_groups,
            vec![
                Some(StudyGroup::UnderFive),
                Some(StudyGroup::FiveToTen),
                Some(StudyGroup::OverTen),
                None,
                None,
                Some(StudyGroup::OverTen),
            ]
        );
    }

    #[test]
    fn test_welch_known_value() {
        // Equal variances and sizes give df = 2, where p = 1 - |t|/√(2 + t²).
        let result = welch_t_test(&[1.0, 3.0], &[5.0, 7.0]).unwrap();
        let t = -2.0 * 2f64.sqrt();
        assert_abs_diff_eq!(result.statistic, t, epsilon = 1e-12);
        assert_abs_diff_eq!(
            result.p_value,
            1.0 - t.abs() / (2.0 + t * t).sqrt(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_welch_unequal_variances() {
        let result = welch_t_test(&[3.0, 3.2], &[3.8, 3.9]).unwrap();
        assert_abs_diff_eq!(result.statistic, -0.75 / 0.0125f64.sqrt(), epsilon = 1e-9);
        assert!(result.p_value > 0.0 && result.p_value < 0.2);
    }

    #[test]
    fn test_empty_extreme_group_skips_test() {
        let comparison = compare_groups(&columns(&[
            (Some(2.0), Some(3.0)),
            (Some(3.0), Some(3.1)),
            (Some(7.0), Some(3.4)),
        ]));
        assert_eq!(
            comparison.test,
            Err(AnalysisError::InsufficientGroupData {
                group: ">10h",
                size: 0
            })
        );
        // The partition is still available for display.
        assert_eq!(comparison.grouped.sample(StudyGroup::UnderFive).len(), 2);
    }

    #[test]
    fn test_middle_group_is_ignored() {
        let base = [
            (Some(2.0), Some(3.0)),
            (Some(4.0), Some(3.2)),
            (Some(12.0), Some(3.8)),
            (Some(15.0), Some(3.9)),
        ];
        let mut with_middle = base.to_vec();
        with_middle.push((Some(7.0), Some(1.0)));
        assert_eq!(
            compare_groups(&columns(&base)).test,
            compare_groups(&columns(&with_middle)).test
        );
    }

    #[test]
    fn test_constant_groups() {
        let err = welch_t_test(&[3.0, 3.0], &[3.5, 3.5]).unwrap_err();
        assert_eq!(err, AnalysisError::ConstantInput { column: "gpa".into() });
    }
}
