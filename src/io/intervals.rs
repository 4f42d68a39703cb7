//! Interval boundary files.
//!
//! The usual form is a JSON object mapping a label to a boundary time:
//!
//! ```json
//! { "start": 0, "switch_1": 5, "switch_2": 10, "end": 48 }
//! ```
//!
//! Labels are informational; boundaries are sorted by time. A plain JSON array
//! of times is accepted as well.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::FitError;
use crate::segment::IntervalBoundaries;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BoundaryFile {
    Labeled(BTreeMap<String, f64>),
    List(Vec<f64>),
}

/// Read, sort and validate interval boundaries from a JSON file.
pub fn read_boundaries(path: &Path) -> Result<IntervalBoundaries, FitError> {
    let file = File::open(path)
        .map_err(|e| FitError::Io(format!("failed to open intervals file '{}': {e}", path.display())))?;
    let parsed: BoundaryFile = serde_json::from_reader(file)
        .map_err(|e| FitError::Io(format!("invalid intervals JSON '{}': {e}", path.display())))?;
    parse_boundaries(parsed)
}

/// Same as [`read_boundaries`] for an in-memory JSON document.
pub fn boundaries_from_json(json: &str) -> Result<IntervalBoundaries, FitError> {
    let parsed: BoundaryFile =
        serde_json::from_str(json).map_err(|e| FitError::Io(format!("invalid intervals JSON: {e}")))?;
    parse_boundaries(parsed)
}

fn parse_boundaries(parsed: BoundaryFile) -> Result<IntervalBoundaries, FitError> {
    let points = match parsed {
        BoundaryFile::Labeled(map) => {
            debug!("interval labels: {:?}", map.keys().collect::<Vec<_>>());
            map.into_values().collect()
        }
        BoundaryFile::List(points) => points,
    };
    IntervalBoundaries::from_unsorted(points)
}
