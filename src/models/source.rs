use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::SOURCE_FILE_PREFIX;

/// Metadata encoded in an sgpmet source file name, e.g.
/// `sgpmetE11.b1.20160101.000000.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SourceMetadata {
    #[validate(length(min = 1, max = 8))]
    pub instrument_id: String,

    #[validate(length(equal = 2))]
    pub data_level: String,

    pub date: NaiveDate,
}

impl SourceMetadata {
    pub fn new(instrument_id: String, data_level: String, date: NaiveDate) -> Self {
        Self {
            instrument_id,
            data_level,
            date,
        }
    }

    /// Parse and validate the metadata of a source file name.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let invalid = || ProcessingError::InvalidFilename(filename.to_string());

        let rest = filename.strip_prefix(SOURCE_FILE_PREFIX).ok_or_else(invalid)?;
        let parts: Vec<&str> = rest.split('.').collect();

        // instrument, level, date, time, extension
        if parts.len() < 4 {
            return Err(invalid());
        }

        let date = NaiveDate::parse_from_str(parts[2], "%Y%m%d").map_err(|_| {
            ProcessingError::InvalidFilename(format!(
                "{}: invalid date '{}'",
                filename, parts[2]
            ))
        })?;

        let metadata = Self::new(parts[0].to_string(), parts[1].to_string(), date);
        metadata.validate()?;

        if !metadata
            .instrument_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
        {
            return Err(invalid());
        }

        Ok(metadata)
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn matches(&self, instrument_id: &str, year: i32) -> bool {
        self.instrument_id == instrument_id && self.year() == year
    }
}
