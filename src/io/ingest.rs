//! Observation CSV ingest.
//!
//! Input files hold two columns, `time` and released amount, one sample per
//! row. A header row is optional: if the first record does not parse as two
//! numbers it is treated as a header and skipped. Lines starting with `#` are
//! ignored. Anything else that does not parse is an error; rows are never
//! skipped silently.

use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use log::debug;

use crate::domain::TimeSeries;
use crate::error::FitError;

/// Read `(time, value)` observations from `path`.
///
/// Times must be finite, non-negative and strictly increasing.
pub fn read_observations(path: &Path, delimiter: u8) -> Result<TimeSeries, FitError> {
    let file = File::open(path)
        .map_err(|e| FitError::Io(format!("failed to open data file '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut times = Vec::new();
    let mut values = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record = result.map_err(|e| FitError::Io(format!("{}: CSV parse error: {e}", path.display())))?;

        match parse_row(&record) {
            Ok((t, c)) => {
                times.push(t);
                values.push(c);
            }
            Err(_) if idx == 0 => {
                debug!("{}: treating first row {:?} as a header", path.display(), record);
            }
            Err(msg) => {
                return Err(FitError::InvalidInput(format!(
                    "{} record {line}: {msg}",
                    path.display()
                )));
            }
        }
    }

    if times.is_empty() {
        return Err(FitError::InvalidInput(format!(
            "{}: no observations found",
            path.display()
        )));
    }

    debug!("{}: read {} observation(s)", path.display(), times.len());
    TimeSeries::new(times, values)
}

fn parse_row(record: &StringRecord) -> Result<(f64, f64), String> {
    let mut fields: Vec<&str> = record.iter().collect();
    // Tolerate a single trailing delimiter.
    if fields.len() == 3 && fields[2].is_empty() {
        fields.pop();
    }
    if fields.len() != 2 {
        return Err(format!("expected 2 columns, found {}", fields.len()));
    }
    if let Some(i) = fields.iter().position(|f| f.is_empty()) {
        return Err(format!("empty {} field", ["time", "value"][i]));
    }
    let t = parse_f64(fields[0], "time")?;
    let c = parse_f64(fields[1], "value")?;
    Ok((t, c))
}

fn parse_f64(s: &str, what: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid {what} '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite {what} '{s}'"))
    }
}
