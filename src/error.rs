use chrono::NaiveDateTime;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Timestamp {timestamp} is outside year {year} ({resolution} grid)")]
    InputRange {
        timestamp: NaiveDateTime,
        year: i32,
        resolution: String,
    },

    #[error("Degenerate series for {variable}: all valid values are equal")]
    DegenerateSeries { variable: String },

    #[error("Insufficient data: {points} valid points ({context})")]
    InsufficientData { points: usize, context: String },

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("{instrument} {year}: {source}")]
    Unit {
        instrument: String,
        year: i32,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Attach the (instrument, year) unit this error occurred in.
    pub fn in_unit(self, instrument: &str, year: i32) -> Self {
        match self {
            already @ ProcessingError::Unit { .. } => already,
            other => ProcessingError::Unit {
                instrument: instrument.to_string(),
                year,
                source: Box::new(other),
            },
        }
    }

    /// True when a unit had no input at all.
    pub fn is_missing_data(&self) -> bool {
        match self {
            ProcessingError::MissingData(_) => true,
            ProcessingError::Unit { source, .. } => source.is_missing_data(),
            _ => false,
        }
    }

    /// True for the conditions a `skip` degenerate policy may absorb.
    pub fn is_degenerate(&self) -> bool {
        match self {
            ProcessingError::DegenerateSeries { .. } | ProcessingError::InsufficientData { .. } => {
                true
            }
            ProcessingError::Unit { source, .. } => source.is_degenerate(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_context_is_not_nested() {
        let err = ProcessingError::DegenerateSeries {
            variable: "temp_mean".to_string(),
        }
        .in_unit("E11", 2016)
        .in_unit("E13", 2017);

        let message = err.to_string();
        assert!(message.starts_with("E11 2016:"));
        assert!(message.contains("temp_mean"));
        assert!(err.is_degenerate());
    }

    #[test]
    fn test_io_error_is_not_degenerate() {
        let err = ProcessingError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!err.is_degenerate());
    }
}
