//! Read/write segmented model JSON files.
//!
//! A model file is the portable form of a fit:
//! - interval boundaries and the time origin segments were fitted on
//! - one `(model, params)` entry per interval
//! - per-interval fit diagnostics, when the file came from a fit
//!
//! Loading rebuilds and revalidates the [`SegmentedModel`], so a hand-edited
//! file with mismatched parameters is rejected.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FitResult, ParameterVector, ReleaseModel, TimeOrigin};
use crate::error::FitError;
use crate::segment::{IntervalBoundaries, SegmentedModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub model: ReleaseModel,
    pub params: ParameterVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub time_origin: TimeOrigin,
    pub boundaries: IntervalBoundaries,
    pub segments: Vec<SegmentRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fits: Vec<FitResult>,
}

impl ModelFile {
    pub fn from_model(model: &SegmentedModel, fits: &[FitResult]) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            generated_at: Utc::now(),
            time_origin: model.origin(),
            boundaries: model.boundaries().clone(),
            segments: model
                .segments()
                .iter()
                .map(|s| SegmentRecord {
                    model: s.model,
                    params: s.params.clone(),
                })
                .collect(),
            fits: fits.to_vec(),
        }
    }

    pub fn to_model(&self) -> Result<SegmentedModel, FitError> {
        let parts = self
            .segments
            .iter()
            .map(|s| (s.model, s.params.clone()))
            .collect();
        SegmentedModel::new(self.boundaries.clone(), parts, self.time_origin)
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, model: &SegmentedModel, fits: &[FitResult]) -> Result<(), FitError> {
    let file = File::create(path)
        .map_err(|e| FitError::Io(format!("failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &ModelFile::from_model(model, fits))
        .map_err(|e| FitError::Io(format!("failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file and rebuild the segmented model it describes.
pub fn read_model_json(path: &Path) -> Result<(SegmentedModel, ModelFile), FitError> {
    let file = File::open(path)
        .map_err(|e| FitError::Io(format!("failed to open model JSON '{}': {e}", path.display())))?;
    let parsed: ModelFile =
        serde_json::from_reader(file).map_err(|e| FitError::Io(format!("invalid model JSON: {e}")))?;
    let model = parsed.to_model()?;
    Ok((model, parsed))
}
