use thiserror::Error;

/// Everything that can go wrong between a loaded sheet and the report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// No column looked like study hours and/or GPA.
    #[error("required columns missing (study hours: {study_hours}, GPA: {gpa})")]
    SchemaResolution { study_hours: bool, gpa: bool },

    #[error("column '{column}' row {row} is not numeric: '{value}'")]
    DataType {
        column: String,
        row: usize,
        value: String,
    },

    #[error("need at least 2 paired observations, found {pairs}")]
    InsufficientData { pairs: usize },

    /// r (or t) is undefined because a sample has no spread.
    #[error("column '{column}' has no variance")]
    ConstantInput { column: String },

    #[error("group '{group}' has {size} GPA value(s), need at least 2")]
    InsufficientGroupData { group: &'static str, size: usize },

    /// Infinite input or overflow left a statistic undefined.
    #[error("{quantity} is not a finite number")]
    NonFinite { quantity: String },

    #[error("{0}")]
    Unexpected(String),
}

impl AnalysisError {
    /// Message shown in the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::SchemaResolution { .. } => {
                "❌ Required columns missing. Please make sure your file includes something like \
                 'Study Hours' and 'GPA'."
                    .to_string()
            }
            AnalysisError::InsufficientGroupData { .. } => {
                format!("⚠️ Not enough data in <5h or >10h groups for t-test ({self}).")
            }
            AnalysisError::Unexpected(msg) => format!("⚠️ Error loading file: {msg}"),
            other => format!("⚠️ {other}"),
        }
    }

    /// Whether the whole analysis stops, as opposed to one report section.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::SchemaResolution { .. }
                | AnalysisError::DataType { .. }
                | AnalysisError::Unexpected(_)
        )
    }
}

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        AnalysisError::Unexpected(format!("{err:#}"))
    }
}
