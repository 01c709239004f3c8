use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, Result};
use crate::models::{
    CorrelationMatrix, MatrixFileName, MetVariable, Resolution, Season, SeasonalPartition, Variant,
};
use crate::processors::correlation::correlation_matrix;
use crate::processors::grid_aligner::Grid;
use crate::processors::normalizer::normalize;
use crate::processors::qc_mask::{PrecipZeroRule, QcMaskCombiner};
use crate::readers::{ObservationReader, SourceScanner};

/// What to do when a series cannot be normalized or correlated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DegeneratePolicy {
    /// Fail the whole unit.
    #[default]
    Abort,
    /// Leave the affected entries undefined and keep going.
    Skip,
}

/// One correlation matrix of a unit, with the file it belongs in.
#[derive(Debug, Clone)]
pub struct MatrixResult {
    pub file_name: MatrixFileName,
    pub matrix: CorrelationMatrix,
    pub points: usize,
    pub skipped: Vec<MetVariable>,
}

/// All matrices computed for one (instrument, year).
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub instrument_id: String,
    pub year: i32,
    pub resolution: Resolution,
    pub observations: usize,
    pub matrices: Vec<MatrixResult>,
}

impl UnitResult {
    pub fn skipped_variables(&self) -> usize {
        self.matrices.iter().map(|m| m.skipped.len()).sum()
    }
}

/// Runs grid alignment, masking, normalization and correlation for one unit.
#[derive(Debug, Clone)]
pub struct CorrelationPipeline {
    resolution: Resolution,
    variants: Vec<Variant>,
    seasonal: bool,
    policy: DegeneratePolicy,
    zero_rule: PrecipZeroRule,
}

impl CorrelationPipeline {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            variants: Variant::ALL.to_vec(),
            seasonal: false,
            policy: DegeneratePolicy::default(),
            zero_rule: PrecipZeroRule::default(),
        }
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        if !variants.is_empty() {
            self.variants = variants;
        }
        self
    }

    pub fn with_seasonal(mut self, seasonal: bool) -> Self {
        self.seasonal = seasonal;
        self
    }

    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_zero_rule(mut self, zero_rule: PrecipZeroRule) -> Self {
        self.zero_rule = zero_rule;
        self
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Build the grid for one unit from the matching source files in a
    /// directory. Errors carry the unit they occurred in.
    pub fn load_grid(&self, input_dir: &Path, instrument_id: &str, year: i32) -> Result<Grid> {
        self.try_load_grid(input_dir, instrument_id, year)
            .map_err(|e| e.in_unit(instrument_id, year))
    }

    fn try_load_grid(&self, input_dir: &Path, instrument_id: &str, year: i32) -> Result<Grid> {
        let files: Vec<PathBuf> = SourceScanner::new(input_dir)
            .files_for(instrument_id, year)?
            .into_iter()
            .map(|f| f.path)
            .collect();

        if files.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "no source files for {} in {} under {}",
                instrument_id,
                year,
                input_dir.display()
            )));
        }

        let mut grid = Grid::new(year, self.resolution)?;
        let reader = ObservationReader::new();
        for path in &files {
            let count = reader.fold_into(path, &mut grid)?;
            debug!(file = %path.display(), observations = count, "read source file");
        }

        info!(
            instrument = instrument_id,
            year,
            files = files.len(),
            observations = grid.observation_count(),
            resolution = %self.resolution,
            "built grid"
        );
        Ok(grid)
    }

    /// Read, grid and correlate one (instrument, year) unit.
    pub fn run_unit(&self, input_dir: &Path, instrument_id: &str, year: i32) -> Result<UnitResult> {
        let grid = self.load_grid(input_dir, instrument_id, year)?;
        self.run_grid(&grid, instrument_id)
    }

    /// Correlate an already built grid for every configured variant.
    pub fn run_grid(&self, grid: &Grid, instrument_id: &str) -> Result<UnitResult> {
        let year = grid.year();
        let combiner = QcMaskCombiner::with_zero_rule(self.zero_rule);
        let partition = SeasonalPartition::for_year(year, grid.resolution());
        let mut matrices = Vec::new();

        for &variant in &self.variants {
            let mask = combiner.combine(grid, variant);

            let scopes: Vec<Option<Season>> = if self.seasonal {
                Season::ALL.into_iter().map(Some).collect()
            } else {
                vec![None]
            };

            for season in scopes {
                let range = match season {
                    Some(season) => partition.clipped_range(season, mask.len()),
                    None => 0..mask.len(),
                };
                let series = combiner.co_filter(grid, &mask, range);
                let result = self
                    .correlate(variant, series)
                    .map_err(|e| e.in_unit(instrument_id, year))?;

                let (matrix, points, skipped) = result;
                matrices.push(MatrixResult {
                    file_name: MatrixFileName::new(instrument_id, year, season, variant),
                    matrix,
                    points,
                    skipped,
                });
            }
        }

        Ok(UnitResult {
            instrument_id: instrument_id.to_string(),
            year,
            resolution: grid.resolution(),
            observations: grid.observation_count(),
            matrices,
        })
    }

    /// Normalize and correlate one co-filtered set under the degenerate
    /// policy. Returns the matrix, its point count and skipped variables.
    fn correlate(
        &self,
        variant: Variant,
        series: Vec<(MetVariable, Vec<f64>)>,
    ) -> Result<(CorrelationMatrix, usize, Vec<MetVariable>)> {
        let variables: Vec<MetVariable> = series.iter().map(|(v, _)| *v).collect();
        let points = series.first().map(|(_, s)| s.len()).unwrap_or(0);

        if points < 2 {
            let err = ProcessingError::InsufficientData {
                points,
                context: format!("variant {}", variant),
            };
            return match self.policy {
                DegeneratePolicy::Abort => Err(err),
                DegeneratePolicy::Skip => {
                    warn!(%variant, points, "too few valid points, matrix left undefined");
                    Ok((CorrelationMatrix::undefined(variables.clone()), points, variables))
                }
            };
        }

        let mut normalized = Vec::with_capacity(series.len());
        let mut skipped = Vec::new();
        for (variable, values) in series {
            match normalize(variable, &values) {
                Ok(scaled) => normalized.push((variable, scaled)),
                Err(e) if e.is_degenerate() && self.policy == DegeneratePolicy::Skip => {
                    warn!(%variable, %variant, "degenerate series skipped");
                    skipped.push(variable);
                }
                Err(e) => return Err(e),
            }
        }

        if normalized.is_empty() {
            return Ok((CorrelationMatrix::undefined(variables), points, skipped));
        }
        let partial = correlation_matrix(&normalized)?;

        let mut matrix = CorrelationMatrix::undefined(variables.clone());
        for (i, a) in variables.iter().enumerate() {
            for (j, b) in variables.iter().enumerate() {
                matrix.set(i, j, partial.between(*a, *b));
            }
        }

        debug!(%variant, points, skipped = skipped.len(), "correlated");
        Ok((matrix, points, skipped))
    }
}

impl Default for CorrelationPipeline {
    fn default() -> Self {
        Self::new(Resolution::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, Reading};
    use chrono::{NaiveDate, NaiveDateTime};

    fn noon(year: i32, ordinal: u32) -> NaiveDateTime {
        NaiveDate::from_yo_opt(year, ordinal)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    /// Daily grid where every variable varies with the day except
    /// `constant`, which is held at one value.
    fn daily_grid(constant: Option<MetVariable>) -> Grid {
        let mut grid = Grid::new(2017, Resolution::Day).unwrap();
        for ordinal in 1..=365u32 {
            let x = ordinal as f64;
            let wobble = ((ordinal * 37) % 11) as f64;
            let mut obs = Observation::new(noon(2017, ordinal));
            for variable in MetVariable::ALL {
                let value = match variable {
                    v if Some(v) == constant => 3.0,
                    MetVariable::AtmosPressure => 100.0 + x,
                    MetVariable::TempMean => 2.0 * x + wobble,
                    MetVariable::RhMean => 90.0 - x * 0.1 + wobble,
                    MetVariable::VaporPressureMean => wobble,
                    MetVariable::WspdArithMean => (x * 0.3).sin() + 2.0,
                    MetVariable::TbrgPrecipTotalCorr => 1.0 + wobble,
                };
                obs.set_reading(variable, Reading::good(value));
            }
            grid.insert(&obs).unwrap();
        }
        grid
    }

    #[test]
    fn test_run_grid_yearly_matrices() {
        let grid = daily_grid(None);
        let result = CorrelationPipeline::new(Resolution::Day)
            .run_grid(&grid, "E11")
            .unwrap();

        assert_eq!(result.matrices.len(), 3);
        let names: Vec<String> = result
            .matrices
            .iter()
            .map(|m| m.file_name.to_filename())
            .collect();
        assert_eq!(names, vec!["E112017.0.csv", "E112017.1.csv", "E112017.2.csv"]);

        let no_precip = &result.matrices[0];
        assert_eq!(no_precip.matrix.size(), 5);
        assert_eq!(no_precip.points, 365);
        let r = no_precip
            .matrix
            .between(MetVariable::AtmosPressure, MetVariable::TempMean)
            .unwrap();
        assert!(r > 0.99);

        let lagged = &result.matrices[2];
        assert_eq!(lagged.matrix.size(), 6);
        assert_eq!(lagged.points, 364);
    }

    #[test]
    fn test_run_grid_seasonal_matrices() {
        let grid = daily_grid(None);
        let result = CorrelationPipeline::new(Resolution::Day)
            .with_variants(vec![Variant::NoPrecip])
            .with_seasonal(true)
            .run_grid(&grid, "E11")
            .unwrap();

        let points: Vec<usize> = result.matrices.iter().map(|m| m.points).collect();
        assert_eq!(points, vec![90, 91, 92, 92]);
        assert_eq!(result.matrices[3].file_name.to_filename(), "E112017.3.0.csv");
    }

    #[test]
    fn test_abort_policy_names_variable_and_unit() {
        let grid = daily_grid(Some(MetVariable::RhMean));
        let err = CorrelationPipeline::new(Resolution::Day)
            .run_grid(&grid, "E11")
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("E11 2017"));
        assert!(message.contains("rh_mean"));
        assert!(err.is_degenerate());
    }

    #[test]
    fn test_skip_policy_leaves_variable_undefined() {
        let grid = daily_grid(Some(MetVariable::RhMean));
        let result = CorrelationPipeline::new(Resolution::Day)
            .with_variants(vec![Variant::NoPrecip])
            .with_degenerate_policy(DegeneratePolicy::Skip)
            .run_grid(&grid, "E11")
            .unwrap();

        let matrix = &result.matrices[0];
        assert_eq!(matrix.skipped, vec![MetVariable::RhMean]);
        assert_eq!(matrix.matrix.undefined_variables(), vec![MetVariable::RhMean]);
        assert_eq!(matrix.matrix.between(MetVariable::RhMean, MetVariable::TempMean), None);
        assert_eq!(
            matrix.matrix.between(MetVariable::TempMean, MetVariable::TempMean),
            Some(1.0)
        );
        assert!(matrix.matrix.is_symmetric(1e-9));
    }

    #[test]
    fn test_insufficient_data_under_each_policy() {
        let grid = Grid::new(2017, Resolution::Day).unwrap();
        let pipeline = CorrelationPipeline::new(Resolution::Day).with_variants(vec![Variant::WithPrecip]);

        let err = pipeline.run_grid(&grid, "E13").unwrap_err();
        assert!(err.is_degenerate());
        assert!(err.to_string().contains("Insufficient data"));

        let result = pipeline
            .with_degenerate_policy(DegeneratePolicy::Skip)
            .run_grid(&grid, "E13")
            .unwrap();
        let matrix = &result.matrices[0];
        assert_eq!(matrix.points, 0);
        assert_eq!(matrix.matrix.undefined_variables().len(), 6);
    }
}
