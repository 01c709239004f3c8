use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::season::Season;
use crate::models::variable::MetVariable;
use crate::models::variant::Variant;

/// Square Pearson correlation matrix over an ordered set of variables.
///
/// `None` entries mark variables whose series could not be correlated (only
/// produced under the `skip` degenerate policy).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    variables: Vec<MetVariable>,
    values: Vec<Option<f64>>,
}

impl CorrelationMatrix {
    pub fn from_values(variables: Vec<MetVariable>, values: Vec<Option<f64>>) -> Result<Self> {
        let n = variables.len();
        if values.len() != n * n {
            return Err(ProcessingError::InvalidFormat(format!(
                "Matrix over {} variables needs {} entries, got {}",
                n,
                n * n,
                values.len()
            )));
        }
        Ok(Self { variables, values })
    }

    /// Matrix with every entry undefined.
    pub fn undefined(variables: Vec<MetVariable>) -> Self {
        let n = variables.len();
        Self {
            variables,
            values: vec![None; n * n],
        }
    }

    pub fn size(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[MetVariable] {
        &self.variables
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values[row * self.size() + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        let n = self.size();
        self.values[row * n + col] = value;
    }

    pub fn row(&self, row: usize) -> &[Option<f64>] {
        let n = self.size();
        &self.values[row * n..(row + 1) * n]
    }

    pub fn between(&self, a: MetVariable, b: MetVariable) -> Option<f64> {
        let row = self.variables.iter().position(|v| *v == a)?;
        let col = self.variables.iter().position(|v| *v == b)?;
        self.get(row, col)
    }

    pub fn pair_value(&self, pair: &VariablePair) -> Option<f64> {
        if pair.row >= self.size() {
            return None;
        }
        self.get(pair.row, pair.col)
    }

    /// Variables whose diagonal entry is undefined.
    pub fn undefined_variables(&self) -> Vec<MetVariable> {
        (0..self.size())
            .filter(|&i| self.get(i, i).is_none())
            .map(|i| self.variables[i])
            .collect()
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.size();
        (0..n).all(|i| {
            (0..i).all(|j| match (self.get(i, j), self.get(j, i)) {
                (Some(a), Some(b)) => (a - b).abs() <= tolerance,
                (None, None) => true,
                _ => false,
            })
        })
    }
}

/// One off-diagonal, lower-triangle matrix entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariablePair {
    /// 1-based position in row-major lower-triangle order.
    pub number: usize,
    pub row: usize,
    pub col: usize,
    pub first: MetVariable,
    pub second: MetVariable,
}

impl VariablePair {
    pub fn key(&self) -> String {
        format!("x{}", self.number)
    }

    pub fn label(&self) -> String {
        format!("{}: {} & {}", self.key(), self.first, self.second)
    }
}

/// Enumerate the lower triangle row by row: (1,0), (2,0), (2,1), (3,0), ...
pub fn pairs_for(variables: &[MetVariable]) -> Vec<VariablePair> {
    let mut pairs = Vec::with_capacity(variables.len() * variables.len().saturating_sub(1) / 2);
    for row in 1..variables.len() {
        for col in 0..row {
            pairs.push(VariablePair {
                number: pairs.len() + 1,
                row,
                col,
                first: variables[col],
                second: variables[row],
            });
        }
    }
    pairs
}

/// One scalar correlation taken from a stored matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSample {
    pub year: i32,
    pub instrument_id: String,
    pub correlation_value: f64,
    pub season: Option<Season>,
}

impl CorrelationSample {
    pub fn new(year: i32, instrument_id: &str, correlation_value: f64, season: Option<Season>) -> Self {
        Self {
            year,
            instrument_id: instrument_id.to_string(),
            correlation_value,
            season,
        }
    }
}

/// Outlier records have the same shape as the samples they were drawn from.
pub type OutlierRecord = CorrelationSample;

/// Name of a stored matrix file: `<instrument><YYYY>[.<season>].<variant>.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatrixFileName {
    pub instrument_id: String,
    pub year: i32,
    pub season: Option<Season>,
    pub variant: Variant,
}

impl MatrixFileName {
    pub fn new(instrument_id: &str, year: i32, season: Option<Season>, variant: Variant) -> Self {
        Self {
            instrument_id: instrument_id.to_string(),
            year,
            season,
            variant,
        }
    }

    pub fn to_filename(&self) -> String {
        match self.season {
            Some(season) => format!(
                "{}{:04}.{}.{}.csv",
                self.instrument_id,
                self.year,
                season.id(),
                self.variant.code()
            ),
            None => format!(
                "{}{:04}.{}.csv",
                self.instrument_id,
                self.year,
                self.variant.code()
            ),
        }
    }

    pub fn parse(filename: &str) -> Result<Self> {
        let invalid = || ProcessingError::InvalidFilename(filename.to_string());

        let stem = filename.strip_suffix(".csv").ok_or_else(invalid)?;
        let parts: Vec<&str> = stem.split('.').collect();

        let (prefix, season, variant) = match parts.as_slice() {
            [prefix, variant] => (*prefix, None, *variant),
            [prefix, season, variant] => (*prefix, Some(*season), *variant),
            _ => return Err(invalid()),
        };

        let parse_code = |s: &str| s.parse::<u8>().map_err(|_| invalid());
        let variant = Variant::from_code(parse_code(variant)?)?;
        let season = season.map(parse_code).transpose()?.map(Season::from_id).transpose()?;

        // The year is the last four characters of the prefix.
        if prefix.len() <= 4 || !prefix.is_char_boundary(prefix.len() - 4) {
            return Err(invalid());
        }
        let (instrument_id, year) = prefix.split_at(prefix.len() - 4);
        if !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;

        Ok(Self {
            instrument_id: instrument_id.to_string(),
            year,
            season,
            variant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pair_enumeration_matches_legacy_labels() {
        let pairs = pairs_for(&MetVariable::WITHOUT_PRECIP);
        assert_eq!(pairs.len(), 10);
        assert_eq!(pairs[0].label(), "x1: atmos_pressure & temp_mean");
        assert_eq!(pairs[2].label(), "x3: temp_mean & rh_mean");
        assert_eq!(pairs[5].label(), "x6: rh_mean & vapor_pressure_mean");
        assert_eq!(
            pairs[9].label(),
            "x10: vapor_pressure_mean & wspd_arith_mean"
        );
        assert_eq!((pairs[9].row, pairs[9].col), (4, 3));

        assert_eq!(pairs_for(&MetVariable::ALL).len(), 15);
    }

    #[test]
    fn test_matrix_file_names() {
        let yearly = MatrixFileName::new("E11", 2016, None, Variant::NoPrecip);
        assert_eq!(yearly.to_filename(), "E112016.0.csv");
        assert_eq!(MatrixFileName::parse("E112016.0.csv").unwrap(), yearly);

        let seasonal = MatrixFileName::new("E1", 1999, Some(Season::Winter), Variant::WithPrecipLag);
        assert_eq!(seasonal.to_filename(), "E11999.3.2.csv");
        assert_eq!(MatrixFileName::parse("E11999.3.2.csv").unwrap(), seasonal);
    }

    #[test]
    fn test_invalid_matrix_file_names() {
        assert!(MatrixFileName::parse("E112016.csv").is_err());
        assert!(MatrixFileName::parse("E112016.5.csv").is_err());
        assert!(MatrixFileName::parse("E112016.4.0.csv").is_err());
        assert!(MatrixFileName::parse("2016.0.csv").is_err());
        assert!(MatrixFileName::parse("E11201x.0.csv").is_err());
        assert!(MatrixFileName::parse("E112016.0.txt").is_err());
    }

    #[test]
    fn test_matrix_lookup() {
        let vars = vec![MetVariable::AtmosPressure, MetVariable::TempMean];
        let matrix = CorrelationMatrix::from_values(
            vars,
            vec![Some(1.0), Some(-0.25), Some(-0.25), Some(1.0)],
        )
        .unwrap();

        assert_eq!(matrix.between(MetVariable::TempMean, MetVariable::AtmosPressure), Some(-0.25));
        assert_eq!(matrix.between(MetVariable::RhMean, MetVariable::TempMean), None);
        assert!(matrix.is_symmetric(1e-12));
        assert!(matrix.undefined_variables().is_empty());
        assert!(CorrelationMatrix::from_values(vec![MetVariable::RhMean], vec![]).is_err());
    }
}
