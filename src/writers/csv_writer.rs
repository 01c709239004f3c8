use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::{OutlierPeriod, PairSummary};
use crate::error::Result;
use crate::models::variable::header_for;
use crate::models::{CorrelationMatrix, MetVariable, OutlierRecord};
use crate::processors::daily::DailyRow;
use crate::processors::pipeline::UnitResult;
use crate::utils::constants::{MATRIX_DECIMALS, UNDEFINED_ENTRY};

/// Writes the delimited artifacts of the pipeline.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    decimals: usize,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            decimals: MATRIX_DECIMALS,
        }
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn format_entry(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{:.*}", self.decimals, v),
            None => UNDEFINED_ENTRY.to_string(),
        }
    }

    /// Header of variable names, then one unlabelled row per variable.
    pub fn write_matrix(&self, matrix: &CorrelationMatrix, path: &Path) -> Result<()> {
        let mut out = create(path)?;
        writeln!(out, "{}", header_for(matrix.variables()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);
        for row in 0..matrix.size() {
            let cells: Vec<String> = matrix
                .row(row)
                .iter()
                .map(|v| self.format_entry(*v))
                .collect();
            writer.write_record(&cells)?;
        }
        writer.flush()?;

        debug!(file = %path.display(), size = matrix.size(), "wrote matrix");
        Ok(())
    }

    /// Write every matrix of a unit into `output_dir` under its canonical name.
    pub fn write_unit(&self, unit: &UnitResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)?;
        let mut written = Vec::with_capacity(unit.matrices.len());
        for result in &unit.matrices {
            let path = output_dir.join(result.file_name.to_filename());
            self.write_matrix(&result.matrix, &path)?;
            written.push(path);
        }
        Ok(written)
    }

    /// `year,instrument_id,correlation_value[,season_id]`, one row per record.
    pub fn write_outliers(&self, records: &[OutlierRecord], seasonal: bool, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(create(path)?);

        let mut header = vec!["year", "instrument_id", "correlation_value"];
        if seasonal {
            header.push("season_id");
        }
        writer.write_record(&header)?;

        for record in records {
            let mut row = vec![
                record.year.to_string(),
                record.instrument_id.clone(),
                record.correlation_value.to_string(),
            ];
            if seasonal {
                row.push(record.season.map(|s| s.id().to_string()).unwrap_or_default());
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// `date` plus one column per variable; missing values are left empty.
    pub fn write_daily_series(&self, rows: &[DailyRow], path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(create(path)?);

        let mut header = vec!["date"];
        header.extend(MetVariable::ALL.iter().map(|v| v.name()));
        writer.write_record(&header)?;

        for row in rows {
            let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_pair_summaries(&self, summaries: &[PairSummary], path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(create(path)?);
        writer.write_record([
            "pair", "label", "count", "min", "q1", "median", "q3", "max", "mean",
        ])?;

        for s in summaries {
            writer.write_record(&[
                s.pair.key(),
                s.pair.label(),
                s.count.to_string(),
                self.format_entry(Some(s.min)),
                self.format_entry(Some(s.q1)),
                self.format_entry(Some(s.median)),
                self.format_entry(Some(s.q3)),
                self.format_entry(Some(s.max)),
                self.format_entry(Some(s.mean)),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_periods(&self, periods: &[OutlierPeriod], path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(create(path)?);
        writer.write_record([
            "year",
            "instrument_id",
            "correlation_value",
            "season_id",
            "start",
            "end",
        ])?;

        for period in periods {
            let record = &period.record;
            writer.write_record(&[
                record.year.to_string(),
                record.instrument_id.clone(),
                record.correlation_value.to_string(),
                record.season.map(|s| s.id().to_string()).unwrap_or_default(),
                period.start.format("%Y-%m-%d").to_string(),
                period.end.format("%Y-%m-%d").to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_json<T: Serialize>(&self, value: &T, path: &Path) -> Result<()> {
        let mut out = create(path)?;
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}
