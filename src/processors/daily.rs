use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{MetVariable, Resolution, VARIABLE_COUNT};
use crate::processors::grid_aligner::Grid;
use crate::processors::pipeline::CorrelationPipeline;
use crate::utils::progress::ProgressReporter;

/// One calendar day of averaged, QC-good values.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub values: [Option<f64>; VARIABLE_COUNT],
}

impl DailyRow {
    pub fn value(&self, variable: MetVariable) -> Option<f64> {
        self.values[variable.index()]
    }
}

/// Rows of a per-day grid, one per calendar day of its year.
pub fn daily_rows(grid: &Grid) -> Vec<DailyRow> {
    (0..grid.days())
        .map(|day| {
            let slot = day * grid.slots_per_day();
            DailyRow {
                date: grid.slot_date(slot),
                values: MetVariable::ALL.map(|v| {
                    if grid.is_good(v, slot) {
                        grid.value(v, slot)
                    } else {
                        None
                    }
                }),
            }
        })
        .collect()
}

/// Per-day series of an instrument over a span of years, one row per calendar
/// day. Years without any source files appear as rows with every value empty.
pub fn build_daily_series(
    input_dir: &Path,
    instrument_id: &str,
    begin_year: i32,
    end_year: i32,
    progress: Option<&ProgressReporter>,
) -> Result<Vec<DailyRow>> {
    let pipeline = CorrelationPipeline::new(Resolution::Day);
    let mut rows = Vec::new();

    for (done, year) in (begin_year..=end_year).enumerate() {
        match pipeline.load_grid(input_dir, instrument_id, year) {
            Ok(grid) => rows.extend(daily_rows(&grid)),
            Err(e) if e.is_missing_data() => {
                warn!(instrument = instrument_id, year, "no source files, year left empty");
                rows.extend(daily_rows(&Grid::new(year, Resolution::Day)?));
            }
            Err(e) => return Err(e),
        }
        if let Some(p) = progress {
            p.update(done as u64 + 1);
        }
    }

    info!(
        instrument = instrument_id,
        begin_year,
        end_year,
        days = rows.len(),
        "built daily series"
    );
    Ok(rows)
}
