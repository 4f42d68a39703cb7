//! Export time series to CSV.
//!
//! Values are written with a fixed number of decimals so files diff cleanly.

use std::path::Path;

use crate::domain::TimeSeries;
use crate::error::FitError;

pub const CURVE_HEADER: [&str; 2] = ["time", "value"];

/// Write `(time, value)` rows with a header line.
pub fn write_curve_csv(path: &Path, series: &TimeSeries, precision: usize, delimiter: u8) -> Result<(), FitError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| FitError::Io(format!("failed to create export CSV '{}': {e}", path.display())))?;

    let io_err = |e: csv::Error| FitError::Io(format!("failed to write export CSV '{}': {e}", path.display()));

    writer.write_record(CURVE_HEADER).map_err(io_err)?;
    for (t, v) in series.iter() {
        writer
            .write_record([format!("{t:.precision$}"), format!("{v:.precision$}")])
            .map_err(io_err)?;
    }
    writer
        .flush()
        .map_err(|e| FitError::Io(format!("failed to flush export CSV '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_observations;

    #[test]
    fn writes_fixed_precision_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.csv");
        let series = TimeSeries::new(vec![0.0, 0.5, 1.0], vec![0.0, 1.23456, 2.5]).unwrap();

        write_curve_csv(&path, &series, 3, b';').unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "time;value\n0.000;0.000\n0.500;1.235\n1.000;2.500\n");

        // The header row is skipped on the way back in.
        let back = read_observations(&path, b';').unwrap();
        assert_eq!(back.times, series.times);
    }
}
