use crate::error::{ProcessingError, Result};
use crate::models::MetVariable;

/// Min-max scale a series into [0, 1].
///
/// A series whose values are all equal cannot be scaled and is reported as
/// degenerate rather than divided by zero.
pub fn normalize(variable: MetVariable, values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(ProcessingError::InsufficientData {
            points: 0,
            context: format!("normalizing {}", variable),
        });
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if max == min {
        return Err(ProcessingError::DegenerateSeries {
            variable: variable.to_string(),
        });
    }

    let span = max - min;
    Ok(values.iter().map(|v| (v - min) / span).collect())
}

/// Normalize every series of a co-filtered set, stopping at the first failure.
pub fn normalize_all(series: &[(MetVariable, Vec<f64>)]) -> Result<Vec<(MetVariable, Vec<f64>)>> {
    series
        .iter()
        .map(|(variable, values)| Ok((*variable, normalize(*variable, values)?)))
        .collect()
}
