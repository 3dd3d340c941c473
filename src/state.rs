use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::analysis::error::AnalysisError;
use crate::analysis::{self, Analysis};
use crate::color::HueMap;
use crate::data::loader::load_file;
use crate::data::model::RawTable;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Session-scoped state for one dashboard window, independent of rendering.
/// Every upload replaces it wholesale.
#[derive(Default)]
pub struct AppState {
    /// File the current results came from.
    pub source: Option<PathBuf>,

    /// Loaded sheet (None until a file loads).
    pub raw: Option<RawTable>,

    /// Pipeline output; None when nothing is loaded or analysis failed.
    pub analysis: Option<Analysis>,

    /// Colours for the optional `age` column.
    pub hue_map: Option<HueMap>,

    /// The single fatal error for the current upload, if any.
    pub error: Option<AnalysisError>,

    /// Status line shown in the top bar (e.g. export results).
    pub status_message: Option<String>,
}

impl AppState {
    /// Load a file and run the whole analysis on it.
    pub fn load(&mut self, path: &Path) {
        *self = AppState {
            source: Some(path.to_path_buf()),
            ..AppState::default()
        };

        let raw = match load_file(path) {
            Ok(raw) => raw,
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.error = Some(AnalysisError::from(e));
                return;
            }
        };
        log::info!("Loaded {} rows with columns {:?}", raw.len(), raw.columns);
        self.ingest(raw);
    }

    /// Run the pipeline on an already loaded sheet.
    pub fn ingest(&mut self, raw: RawTable) {
        match analysis::run(&raw) {
            Ok(result) => {
                self.hue_map = result
                    .table
                    .hue_values()
                    .and_then(|values| HueMap::new(&values));
                self.analysis = Some(result);
                self.error = None;
            }
            Err(e) => {
                log::error!("Analysis failed: {e}");
                self.analysis = None;
                self.error = Some(e);
            }
        }
        self.raw = Some(raw);
    }

    /// Write the analysis report as pretty JSON.
    pub fn export_report(&self, path: &Path) -> anyhow::Result<()> {
        let analysis = self
            .analysis
            .as_ref()
            .context("no analysis to export")?;
        let json = serde_json::to_string_pretty(&analysis.report())
            .context("serialising report")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported report to {}", path.display());
        Ok(())
    }
}
