use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{ProcessingError, Result};
use crate::models::{OutlierRecord, Season};

/// Read an outlier file: `year,instrument_id,correlation_value[,season_id]`.
pub fn read_outlier_records(path: &Path) -> Result<Vec<OutlierRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let missing = |name: &str| ProcessingError::InvalidFormat(format!("{}: missing column '{}'", path.display(), name));

    let year_col = column("year").ok_or_else(|| missing("year"))?;
    let instrument_col = column("instrument_id").ok_or_else(|| missing("instrument_id"))?;
    let value_col = column("correlation_value").ok_or_else(|| missing("correlation_value"))?;
    let season_col = column("season_id");

    let invalid = |what: &str, text: &str| {
        ProcessingError::InvalidFormat(format!("{}: invalid {} '{}'", path.display(), what, text))
    };

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let year = field(year_col)
            .parse::<i32>()
            .map_err(|_| invalid("year", field(year_col)))?;
        let value = field(value_col)
            .parse::<f64>()
            .map_err(|_| invalid("correlation_value", field(value_col)))?;
        let season = match season_col.map(field).filter(|s| !s.is_empty()) {
            Some(text) => {
                let id = text.parse::<u8>().map_err(|_| invalid("season_id", text))?;
                Some(Season::from_id(id)?)
            }
            None => None,
        };

        records.push(OutlierRecord::new(year, field(instrument_col), value, season));
    }

    Ok(records)
}
