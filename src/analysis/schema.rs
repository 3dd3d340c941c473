use crate::data::model::{CellValue, RawTable};

use super::error::AnalysisError;

pub const STUDY_HOURS: &str = "study_hours";
pub const GPA: &str = "gpa";
/// Optional third column used only to colour the scatter plot.
pub const HUE_COLUMN: &str = "age";

// ---------------------------------------------------------------------------
// Column-name heuristics
// ---------------------------------------------------------------------------

/// `"  Study Hours "` → `"study_hours"`.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

pub fn is_study_hours_name(name: &str) -> bool {
    name.contains("study") && name.contains("hour")
}

pub fn is_gpa_name(name: &str) -> bool {
    name.contains("gpa") || name.contains("score")
}

/// Index of the first column (in file order) whose name satisfies `pred`.
/// Later matches are ignored, not reported.
pub fn resolve_column(names: &[String], pred: impl Fn(&str) -> bool) -> Option<usize> {
    names.iter().position(|n| pred(n.as_str()))
}

// ---------------------------------------------------------------------------
// NormalizedTable
// ---------------------------------------------------------------------------

/// A sheet with canonical column names and both target columns resolved.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    /// Normalised names; the resolved columns renamed to `study_hours`/`gpa`.
    pub table: RawTable,
    pub study_hours_idx: usize,
    pub gpa_idx: usize,
    pub hue_idx: Option<usize>,
}

/// The two resolved columns coerced to numbers, one entry per row.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumns {
    pub study_hours: Vec<Option<f64>>,
    pub gpa: Vec<Option<f64>>,
}

impl NumericColumns {
    /// Rows where both values are present.
    pub fn complete_pairs(&self) -> Vec<(f64, f64)> {
        self.study_hours
            .iter()
            .zip(&self.gpa)
            .filter_map(|(h, g)| Some(((*h)?, (*g)?)))
            .collect()
    }
}

/// Canonicalise column names and resolve `study_hours` and `gpa`.
pub fn normalize(raw: &RawTable) -> Result<NormalizedTable, AnalysisError> {
    let mut columns: Vec<String> = raw.columns.iter().map(|c| normalize_name(c)).collect();

    let study = resolve_column(&columns, is_study_hours_name);
    let gpa = resolve_column(&columns, is_gpa_name);

    let (study_hours_idx, gpa_idx) = match (study, gpa) {
        (Some(s), Some(g)) if s != g => (s, g),
        // One column matching both heuristics cannot serve as both.
        (Some(s), Some(_)) => {
            log::debug!("Column '{}' matches both study hours and GPA", columns[s]);
            return Err(AnalysisError::SchemaResolution {
                study_hours: true,
                gpa: false,
            });
        }
        (s, g) => {
            return Err(AnalysisError::SchemaResolution {
                study_hours: s.is_some(),
                gpa: g.is_some(),
            })
        }
    };

    log::debug!(
        "Resolved study hours ← '{}', GPA ← '{}'",
        raw.columns[study_hours_idx],
        raw.columns[gpa_idx]
    );
    columns[study_hours_idx] = STUDY_HOURS.to_string();
    columns[gpa_idx] = GPA.to_string();

    let hue_idx = columns.iter().position(|c| c == HUE_COLUMN);

    Ok(NormalizedTable {
        table: RawTable {
            columns,
            rows: raw.rows.clone(),
        },
        study_hours_idx,
        gpa_idx,
        hue_idx,
    })
}

impl NormalizedTable {
    /// Coerce both resolved columns to numbers.
    pub fn numeric_columns(&self) -> Result<NumericColumns, AnalysisError> {
        Ok(NumericColumns {
            study_hours: self.numeric(self.study_hours_idx)?,
            gpa: self.numeric(self.gpa_idx)?,
        })
    }

    fn numeric(&self, idx: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
        self.table
            .column_values(idx)
            .enumerate()
            .map(|(row, cell)| {
                if cell.is_missing() {
                    return Ok(None);
                }
                match cell.as_f64() {
                    Some(v) => Ok(Some(v)),
                    None => Err(AnalysisError::DataType {
                        column: self.table.columns[idx].clone(),
                        row,
                        value: cell.to_string(),
                    }),
                }
            })
            .collect()
    }

    /// Hue value per row, if an `age` column exists.
    pub fn hue_values(&self) -> Option<Vec<CellValue>> {
        let idx = self.hue_idx?;
        Some(self.table.column_values(idx).cloned().collect())
    }
}
