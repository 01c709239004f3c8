use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{ProcessingError, Result};
use crate::models::Resolution;
use crate::processors::pipeline::CorrelationPipeline;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;

/// Outcome of one (instrument, year) unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Completed {
        observations: usize,
        files: Vec<PathBuf>,
        skipped_variables: usize,
    },
    /// No source files for the year.
    NoData,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub instrument_id: String,
    pub year: i32,
    #[serde(flatten)]
    pub status: UnitStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub instrument_id: String,
    pub resolution: Resolution,
    pub seasonal: bool,
    pub units: Vec<UnitOutcome>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Completed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::Failed { .. }))
    }

    pub fn without_data(&self) -> usize {
        self.count(|s| matches!(s, UnitStatus::NoData))
    }

    pub fn files_written(&self) -> usize {
        self.units
            .iter()
            .map(|u| match &u.status {
                UnitStatus::Completed { files, .. } => files.len(),
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&UnitStatus) -> bool) -> usize {
        self.units.iter().filter(|u| predicate(&u.status)).count()
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = format!(
            "Batch Report: {} ({}, {})\n\
            Units: {} total, {} completed, {} failed, {} without data\n\
            Matrix files written: {}",
            self.instrument_id,
            self.resolution,
            if self.seasonal { "seasonal" } else { "yearly" },
            self.units.len(),
            self.completed(),
            self.failed(),
            self.without_data(),
            self.files_written()
        );

        let failures: Vec<&UnitOutcome> = self
            .units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Failed { .. }))
            .collect();
        if !failures.is_empty() {
            summary.push_str("\n\nFailures:");
            for unit in failures {
                if let UnitStatus::Failed { error } = &unit.status {
                    summary.push_str(&format!("\n- {}: {}", unit.year, error));
                }
            }
        }

        summary
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs many units on a worker pool. One unit failing never stops the others.
pub struct BatchProcessor {
    max_workers: usize,
    pipeline: CorrelationPipeline,
    writer: CsvWriter,
}

impl BatchProcessor {
    pub fn new(max_workers: usize, pipeline: CorrelationPipeline) -> Self {
        Self {
            max_workers: max_workers.max(1),
            pipeline,
            writer: CsvWriter::new(),
        }
    }

    pub fn with_writer(mut self, writer: CsvWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn pipeline(&self) -> &CorrelationPipeline {
        &self.pipeline
    }

    /// Process every year of an instrument and write matrices to `output_dir`.
    pub fn process_years(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        instrument_id: &str,
        years: RangeInclusive<i32>,
        seasonal: bool,
        progress: Option<&ProgressReporter>,
    ) -> Result<BatchReport> {
        let years: Vec<i32> = years.collect();
        let processed = AtomicUsize::new(0);

        if let Some(p) = progress {
            p.set_message(&format!("Processing {} years of {}...", years.len(), instrument_id));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::InvalidSetting(e.to_string()))?;

        let units: Vec<UnitOutcome> = pool.install(|| {
            years
                .par_iter()
                .map(|&year| {
                    let status = self.process_unit(input_dir, output_dir, instrument_id, year);

                    let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    UnitOutcome {
                        instrument_id: instrument_id.to_string(),
                        year,
                        status,
                    }
                })
                .collect()
        });

        let report = BatchReport {
            instrument_id: instrument_id.to_string(),
            resolution: self.pipeline.resolution(),
            seasonal,
            units,
        };

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Processed {} units ({} failed)",
                report.units.len(),
                report.failed()
            ));
        }

        info!(
            instrument = instrument_id,
            completed = report.completed(),
            failed = report.failed(),
            no_data = report.without_data(),
            "batch finished"
        );
        Ok(report)
    }

    fn process_unit(&self, input_dir: &Path, output_dir: &Path, instrument_id: &str, year: i32) -> UnitStatus {
        let result = self
            .pipeline
            .run_unit(input_dir, instrument_id, year)
            .and_then(|unit| {
                let files = self.writer.write_unit(&unit, output_dir)?;
                Ok((unit, files))
            });

        match result {
            Ok((unit, files)) => UnitStatus::Completed {
                observations: unit.observations,
                files,
                skipped_variables: unit.skipped_variables(),
            },
            Err(e) if e.is_missing_data() => {
                warn!(instrument = instrument_id, year, "no source files");
                UnitStatus::NoData
            }
            Err(e) => {
                let e = e.in_unit(instrument_id, year);
                error!(instrument = instrument_id, year, error = %e, "unit failed");
                UnitStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get(), CorrelationPipeline::default())
    }
}
