//! Analysis pipeline: a pure function from a loaded sheet to the report.
//!
//! ```text
//!   RawTable
//!      │
//!      ▼
//!   schema        normalise names, resolve study_hours / gpa   (fatal)
//!      │
//!      ▼
//!   coerce        numeric columns                              (fatal)
//!      │
//!      ├──▶ summary       count/mean/std/min/quartiles/max
//!      ├──▶ correlation   Pearson r + p                        (stage only)
//!      ├──▶ groups        <5h / 5-10h / >10h, Welch t-test      (stage only)
//!      └──▶ charts        histogram, scatter, regression, boxplot data
//! ```
pub mod charts;
pub mod correlation;
pub mod error;
pub mod groups;
pub mod schema;
pub mod summary;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::data::model::RawTable;

use charts::ChartSet;
use error::AnalysisError;
use groups::{GroupComparison, StudyGroup};
use schema::{NormalizedTable, NumericColumns};
use summary::Summary;

/// Fixed decision threshold for both tests.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

// ---------------------------------------------------------------------------
// Test results
// ---------------------------------------------------------------------------

/// A test statistic with its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatResult {
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Significance {
    Significant,
    NotSignificant,
}

impl StatResult {
    pub fn significance(&self) -> Significance {
        if self.p_value < SIGNIFICANCE_LEVEL {
            Significance::Significant
        } else {
            Significance::NotSignificant
        }
    }

    pub fn is_significant(&self) -> bool {
        self.significance() == Significance::Significant
    }
}

/// `2·P(T > |t|)` for a Student t distribution with `df` degrees of freedom.
/// NaN or infinite inputs are rejected before they reach the distribution.
pub(crate) fn two_sided_p_value(t: f64, df: f64) -> Result<f64, AnalysisError> {
    if !t.is_finite() {
        return Err(AnalysisError::NonFinite {
            quantity: format!("t statistic ({t})"),
        });
    }
    if !df.is_finite() {
        return Err(AnalysisError::NonFinite {
            quantity: format!("degrees of freedom ({df})"),
        });
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::Unexpected(format!("t distribution (df = {df}): {e}")))?;
    Ok((2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Everything derived from one uploaded sheet.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub table: NormalizedTable,
    pub columns: NumericColumns,
    pub summary: Summary,
    pub correlation: Result<StatResult, AnalysisError>,
    pub groups: GroupComparison,
    pub charts: ChartSet,
}

/// Run every stage. Only schema resolution and numeric coercion abort the
/// whole analysis; the two tests record their own failures.
pub fn run(raw: &RawTable) -> Result<Analysis, AnalysisError> {
    let table = schema::normalize(raw)?;
    let columns = table.numeric_columns()?;

    let summary = summary::summarize(&columns);

    let correlation = correlation::correlate(&columns);
    if let Err(e) = &correlation {
        log::warn!("Correlation skipped: {e}");
    }

    let groups = groups::compare_groups(&columns);
    if let Err(e) = &groups.test {
        log::warn!("t-test skipped: {e}");
    }

    let charts = ChartSet::build(&table, &columns, &groups.grouped);

    log::info!(
        "Analysed {} rows ({} complete pairs)",
        raw.len(),
        columns.complete_pairs().len()
    );

    Ok(Analysis {
        table,
        columns,
        summary,
        correlation,
        groups,
        charts,
    })
}

// ---------------------------------------------------------------------------
// Exportable report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestReport {
    Completed {
        statistic: f64,
        p_value: f64,
        significant: bool,
    },
    Skipped {
        reason: String,
    },
}

impl From<&Result<StatResult, AnalysisError>> for TestReport {
    fn from(outcome: &Result<StatResult, AnalysisError>) -> Self {
        match outcome {
            Ok(r) => TestReport::Completed {
                statistic: r.statistic,
                p_value: r.p_value,
                significant: r.is_significant(),
            },
            Err(e) => TestReport::Skipped {
                reason: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSize {
    pub group: StudyGroup,
    pub gpa_values: usize,
}

/// Serializable digest of an [`Analysis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub rows: usize,
    pub columns: Vec<String>,
    pub significance_level: f64,
    pub summary: Summary,
    pub correlation: TestReport,
    pub group_sizes: Vec<GroupSize>,
    pub t_test: TestReport,
}

impl Analysis {
    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            rows: self.table.table.len(),
            columns: self.table.table.columns.clone(),
            significance_level: SIGNIFICANCE_LEVEL,
            summary: self.summary,
            correlation: TestReport::from(&self.correlation),
            group_sizes: StudyGroup::ALL
                .iter()
                .map(|&group| GroupSize {
                    group,
                    gpa_values: self.groups.grouped.sample(group).len(),
                })
                .collect(),
            t_test: TestReport::from(&self.groups.test),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn sheet(columns: &[&str], rows: &[&[CellValue]]) -> RawTable {
        RawTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| r.to_vec()).collect(),
        )
    }

    fn f(v: f64) -> CellValue {
        CellValue::Float(v)
    }

    #[test]
    fn test_end_to_end_four_students() {
        let raw = sheet(
            &["Name", "Study Hours", "GPA"],
            &[
                &[CellValue::Text("a".into()), f(2.0), f(3.0)],
                &[CellValue::Text("b".into()), f(4.0), f(3.2)],
                &[CellValue::Text("c".into()), f(12.0), f(3.8)],
                &[CellValue::Text("d".into()), f(15.0), f(3.9)],
            ],
        );
        let analysis = run(&raw).unwrap();

        let grouped = &analysis.groups.grouped;
        assert_eq!(grouped.sample(StudyGroup::UnderFive), &[3.0, 3.2]);
        assert!(grouped.sample(StudyGroup::FiveToTen).is_empty());
        assert_eq!(grouped.sample(StudyGroup::OverTen), &[3.8, 3.9]);

        let r = analysis.correlation.as_ref().unwrap();
        assert!(r.statistic > 0.9);
        assert!(analysis.groups.test.is_ok());
        assert_eq!(analysis.summary.study_hours.count, 4);
    }

    #[test]
    fn test_score_and_hours_studying_end_to_end() {
        let raw = sheet(
            &["Score (%)", "Hours Studying"],
            &[&[f(70.0), f(3.0)], &[f(80.0), f(6.0)], &[f(90.0), f(11.0)]],
        );
        let analysis = run(&raw).unwrap();
        assert_eq!(analysis.table.table.columns, vec!["gpa", "study_hours"]);
        assert_eq!(analysis.columns.study_hours, vec![Some(3.0), Some(6.0), Some(11.0)]);
    }

    #[test]
    fn test_missing_columns_halts_pipeline() {
        let raw = sheet(&["Name", "Age"], &[&[CellValue::Text("a".into()), f(20.0)]]);
        assert!(matches!(
            run(&raw),
            Err(AnalysisError::SchemaResolution { .. })
        ));
    }

    #[test]
    fn test_non_numeric_column_is_fatal() {
        let raw = sheet(
            &["Study Hours", "GPA"],
            &[&[f(2.0), CellValue::Text("B+".into())]],
        );
        let err = run(&raw).unwrap_err();
        assert!(matches!(err, AnalysisError::DataType { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_stage_failures_degrade_gracefully() {
        let raw = sheet(&["Study Hours", "GPA"], &[&[f(7.0), f(3.0)]]);
        let analysis = run(&raw).unwrap();
        assert_eq!(
            analysis.correlation,
            Err(AnalysisError::InsufficientData { pairs: 1 })
        );
        assert!(matches!(
            analysis.groups.test,
            Err(AnalysisError::InsufficientGroupData { group: "<5h", .. })
        ));
        assert_eq!(analysis.summary.gpa.count, 1);
    }

    #[test]
    fn test_significance_threshold_is_strict() {
        let at = StatResult {
            statistic: 2.0,
            p_value: SIGNIFICANCE_LEVEL,
        };
        let below = StatResult {
            statistic: 2.0,
            p_value: 0.049,
        };
        assert_eq!(at.significance(), Significance::NotSignificant);
        assert_eq!(below.significance(), Significance::Significant);
    }

    #[test]
    fn test_p_value_rejects_non_finite_inputs() {
        assert!(matches!(
            two_sided_p_value(f64::NAN, 3.0),
            Err(AnalysisError::NonFinite { .. })
        ));
        assert!(matches!(
            two_sided_p_value(f64::INFINITY, 3.0),
            Err(AnalysisError::NonFinite { .. })
        ));
        assert!(matches!(
            two_sided_p_value(1.0, f64::NAN),
            Err(AnalysisError::NonFinite { .. })
        ));
        assert!(two_sided_p_value(0.0, 3.0).is_ok());
    }

    #[test]
    fn test_infinite_hours_cell_is_a_data_type_error() {
        let raw = sheet(
            &["Study Hours", "GPA"],
            &[
                &[f(1.0), f(1.0)],
                &[f(2.0), f(2.0)],
                &[CellValue::Text("inf".into()), f(3.0)],
            ],
        );
        let err = run(&raw).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::DataType {
                column: "study_hours".into(),
                row: 2,
                value: "inf".into()
            }
        );
    }

    #[test]
    fn test_huge_magnitudes_degrade_without_panicking() {
        let raw = sheet(
            &["Study Hours", "GPA"],
            &[
                &[f(1e200), f(-1e200)],
                &[f(-1e200), f(1e200)],
                &[f(5e199), f(2e200)],
                &[f(2.0), f(3.0)],
            ],
        );
        let analysis = run(&raw).unwrap();
        let r = analysis.correlation.unwrap();
        assert!(r.statistic.is_finite() && r.p_value.is_finite());
        assert!(analysis.groups.test.is_err());
    }

    #[test]
    fn test_report_serializes_skipped_stages() {
        let raw = sheet(&["Study Hours", "GPA"], &[&[f(2.0), f(3.0)], &[f(3.0), f(3.5)]]);
        let report = run(&raw).unwrap().report();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["rows"], 2);
        assert_eq!(json["correlation"]["status"], "completed");
        assert_eq!(json["t_test"]["status"], "skipped");
        assert_eq!(json["group_sizes"][0]["group"], "<5h");
        assert_eq!(json["group_sizes"][0]["gpa_values"], 2);
    }
}
