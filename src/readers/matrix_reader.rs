use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::error::{ProcessingError, Result};
use crate::models::{
    pairs_for, CorrelationMatrix, CorrelationSample, MatrixFileName, MetVariable, Variant,
    VariablePair,
};
use crate::utils::constants::{MATRIX_FILE_EXTENSION, UNDEFINED_ENTRY};

/// Samples of one variable pair across every matched matrix file.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSeries {
    pub pair: VariablePair,
    pub samples: Vec<CorrelationSample>,
}

impl PairSeries {
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.correlation_value).collect()
    }
}

/// Reads correlation matrix files written by the pipeline.
pub struct MatrixReader;

impl MatrixReader {
    pub fn new() -> Self {
        Self
    }

    /// Read one matrix: a header of variable names, then one row per
    /// variable. `nan` entries become `None`.
    pub fn read_matrix(&self, path: &Path) -> Result<CorrelationMatrix> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let variables = reader
            .headers()?
            .iter()
            .map(|name| {
                MetVariable::from_name(name).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!(
                        "{}: unknown variable '{}'",
                        path.display(),
                        name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity(variables.len() * variables.len());
        for record in reader.records() {
            let record = record?;
            for field in record.iter() {
                values.push(parse_entry(field).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!(
                        "{}: invalid matrix entry '{}'",
                        path.display(),
                        field
                    ))
                })?);
            }
        }

        CorrelationMatrix::from_values(variables, values)
    }

    /// Matrix files in `dir` for an instrument and variant, yearly or
    /// seasonal, ordered by year then season.
    pub fn matching_files(
        &self,
        dir: &Path,
        instrument_id: &str,
        variant: Variant,
        seasonal: bool,
    ) -> Result<Vec<(MatrixFileName, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != MATRIX_FILE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Ok(parsed) = MatrixFileName::parse(name) else {
                continue;
            };
            if parsed.instrument_id == instrument_id
                && parsed.variant == variant
                && parsed.season.is_some() == seasonal
            {
                files.push((parsed, path));
            }
        }

        files.sort_by_key(|(name, _)| (name.year, name.season));
        Ok(files)
    }

    /// Extract every lower-triangle pair from the matching matrices into one
    /// sample list per pair. Undefined entries are left out.
    pub fn collect_samples(
        &self,
        dir: &Path,
        instrument_id: &str,
        variant: Variant,
        seasonal: bool,
    ) -> Result<Vec<PairSeries>> {
        let mut series: Vec<PairSeries> = pairs_for(variant.variables())
            .into_iter()
            .map(|pair| PairSeries {
                pair,
                samples: Vec::new(),
            })
            .collect();

        let files = self.matching_files(dir, instrument_id, variant, seasonal)?;
        for (name, path) in &files {
            let matrix = self.read_matrix(path)?;
            if matrix.variables() != variant.variables() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "{}: expected {} variables for variant '{}', found {}",
                    path.display(),
                    variant.variables().len(),
                    variant,
                    matrix.size()
                )));
            }

            for entry in series.iter_mut() {
                if let Some(value) = matrix.pair_value(&entry.pair) {
                    entry.samples.push(CorrelationSample::new(
                        name.year,
                        &name.instrument_id,
                        value,
                        name.season,
                    ));
                }
            }
            debug!(file = %path.display(), "collected pair samples");
        }

        info!(
            instrument = instrument_id,
            %variant,
            seasonal,
            files = files.len(),
            "collected correlation samples"
        );
        Ok(series)
    }
}

impl Default for MatrixReader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_entry(field: &str) -> Option<Option<f64>> {
    if field.eq_ignore_ascii_case(UNDEFINED_ENTRY) {
        return Some(None);
    }
    field.parse::<f64>().ok().map(|v| Some(v).filter(|v| v.is_finite()))
}
