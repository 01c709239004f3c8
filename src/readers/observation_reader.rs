use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use tracing::trace;

use crate::error::{ProcessingError, Result};
use crate::models::{MetVariable, Observation, Reading, VARIABLE_COUNT};
use crate::processors::grid_aligner::Grid;
use crate::utils::constants::TIME_COLUMN;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Column positions of one export, resolved from its header row.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    time: usize,
    values: [usize; VARIABLE_COUNT],
    qc: [usize; VARIABLE_COUNT],
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ProcessingError::InvalidFormat(format!("missing column '{}'", name)))
        };

        let mut values = [0; VARIABLE_COUNT];
        let mut qc = [0; VARIABLE_COUNT];
        for variable in MetVariable::ALL {
            values[variable.index()] = find(variable.name())?;
            qc[variable.index()] = find(variable.qc_name())?;
        }

        Ok(Self {
            time: find(TIME_COLUMN)?,
            values,
            qc,
        })
    }
}

/// Reads sgpmet observation exports: a `time` column plus a value and a
/// `qc_` column per variable.
pub struct ObservationReader {
    delimiter: u8,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Stream every row of a file through `visit`, returning the row count.
    pub fn for_each_observation<F>(&self, path: &Path, mut visit: F) -> Result<usize>
    where
        F: FnMut(Observation) -> Result<()>,
    {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let layout = ColumnLayout::from_headers(reader.headers()?)?;
        let mut count = 0;
        let mut record = StringRecord::new();

        while reader.read_record(&mut record)? {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let observation = parse_record(&record, &layout).map_err(|e| match e {
                ProcessingError::InvalidFormat(msg) => ProcessingError::InvalidFormat(format!(
                    "{}:{}: {}",
                    path.display(),
                    line,
                    msg
                )),
                other => other,
            })?;
            visit(observation)?;
            count += 1;
        }

        trace!(file = %path.display(), rows = count, "read observations");
        Ok(count)
    }

    pub fn read_observations(&self, path: &Path) -> Result<Vec<Observation>> {
        let mut observations = Vec::new();
        self.for_each_observation(path, |obs| {
            observations.push(obs);
            Ok(())
        })?;
        Ok(observations)
    }

    /// Fold every row of a file straight into a grid.
    pub fn fold_into(&self, path: &Path, grid: &mut Grid) -> Result<usize> {
        self.for_each_observation(path, |obs| grid.insert(&obs))
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_record(record: &StringRecord, layout: &ColumnLayout) -> Result<Observation> {
    let field = |i: usize| record.get(i).unwrap_or("");

    let mut observation = Observation::new(parse_timestamp(field(layout.time))?);
    for variable in MetVariable::ALL {
        let value = parse_value(field(layout.values[variable.index()]), variable.name())?;
        let qc = parse_qc(field(layout.qc[variable.index()]), variable.qc_name())?;
        observation.set_reading(variable, Reading::new(value, qc));
    }
    Ok(observation)
}

/// Parse an export timestamp, with or without a `T` separator and trailing `Z`.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z');
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid timestamp: '{}'", text)))
}

fn parse_value(text: &str, column: &str) -> Result<Option<f64>> {
    if is_blank(text) {
        return Ok(None);
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid {} value: '{}'", column, text)))
}

fn parse_qc(text: &str, column: &str) -> Result<Option<i32>> {
    if is_blank(text) {
        return Ok(None);
    }
    if let Ok(code) = text.parse::<i32>() {
        return Ok(Some(code));
    }
    // Some exports write integer flags as floats, e.g. "0.0".
    match text.parse::<f64>() {
        Ok(code) if code.fract() == 0.0 && code.abs() <= i32::MAX as f64 => Ok(Some(code as i32)),
        _ => Err(ProcessingError::InvalidFormat(format!(
            "Invalid {} code: '{}'",
            column, text
        ))),
    }
}

fn is_blank(text: &str) -> bool {
    text.is_empty() || text.eq_ignore_ascii_case("nan") || text == "--"
}
