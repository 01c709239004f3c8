use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::error::{ProcessingError, Result};
use crate::models::season::days_in_year;
use crate::models::{MetVariable, Observation, Resolution, VARIABLE_COUNT};
use crate::utils::constants::{MAX_SUPPORTED_YEAR, MIN_SUPPORTED_YEAR, QC_GOOD};

/// Per-variable slot storage.
#[derive(Debug, Clone)]
struct Column {
    sums: Vec<f64>,
    counts: Vec<u32>,
    qc: Vec<Option<i32>>,
}

impl Column {
    fn new(len: usize) -> Self {
        Self {
            sums: vec![0.0; len],
            counts: vec![0; len],
            qc: vec![None; len],
        }
    }
}

/// Fixed-size time grid covering one calendar year.
///
/// Per-minute grids keep the last observation written to a slot. Per-day
/// grids average every QC-good contribution that falls into the day.
#[derive(Debug, Clone)]
pub struct Grid {
    year: i32,
    resolution: Resolution,
    origin: NaiveDateTime,
    days: usize,
    columns: Vec<Column>,
    folded: usize,
}

impl Grid {
    pub fn new(year: i32, resolution: Resolution) -> Result<Self> {
        if !(MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&year) {
            return Err(ProcessingError::InvalidSetting(format!(
                "Year {} is outside the supported range [{}, {}]",
                year, MIN_SUPPORTED_YEAR, MAX_SUPPORTED_YEAR
            )));
        }

        let origin = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ProcessingError::InvalidSetting(format!("Invalid year: {}", year)))?;
        let days = days_in_year(year);
        let len = days * resolution.slots_per_day();

        Ok(Self {
            year,
            resolution,
            origin,
            days,
            columns: (0..VARIABLE_COUNT).map(|_| Column::new(len)).collect(),
            folded: 0,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn slots_per_day(&self) -> usize {
        self.resolution.slots_per_day()
    }

    pub fn len(&self) -> usize {
        self.days * self.slots_per_day()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of observations folded into the grid so far.
    pub fn observation_count(&self) -> usize {
        self.folded
    }

    /// Slot of a timestamp: whole slot durations elapsed since Jan 1 00:00.
    pub fn slot_index(&self, timestamp: NaiveDateTime) -> Result<usize> {
        let out_of_range = || ProcessingError::InputRange {
            timestamp,
            year: self.year,
            resolution: self.resolution.to_string(),
        };

        if timestamp < self.origin {
            return Err(out_of_range());
        }

        let seconds = (timestamp - self.origin).num_seconds();
        let index = (seconds / self.resolution.slot_seconds()) as usize;
        if index >= self.len() {
            return Err(out_of_range());
        }

        Ok(index)
    }

    /// Start time of a slot.
    pub fn slot_start(&self, index: usize) -> NaiveDateTime {
        self.origin + Duration::seconds(index as i64 * self.resolution.slot_seconds())
    }

    pub fn slot_date(&self, index: usize) -> NaiveDate {
        self.slot_start(index).date()
    }

    /// Fold one observation into its slot.
    pub fn insert(&mut self, observation: &Observation) -> Result<()> {
        let index = self.slot_index(observation.timestamp)?;

        for variable in MetVariable::ALL {
            let reading = observation.reading(variable);
            let column = &mut self.columns[variable.index()];

            match self.resolution {
                Resolution::Minute => {
                    column.qc[index] = reading.qc;
                    match reading.value {
                        Some(value) => {
                            column.sums[index] = value;
                            column.counts[index] = 1;
                        }
                        None => {
                            column.sums[index] = 0.0;
                            column.counts[index] = 0;
                        }
                    }
                }
                Resolution::Day => {
                    if let Some(value) = reading.usable_value() {
                        column.sums[index] += value;
                        column.counts[index] += 1;
                        column.qc[index] = Some(QC_GOOD);
                    } else if column.counts[index] == 0 && reading.qc.is_some() {
                        column.qc[index] = reading.qc;
                    }
                }
            }
        }

        self.folded += 1;
        trace!(index, timestamp = %observation.timestamp, "folded observation");
        Ok(())
    }

    pub fn insert_all<'a, I>(&mut self, observations: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut count = 0;
        for observation in observations {
            self.insert(observation)?;
            count += 1;
        }
        Ok(count)
    }

    /// Aggregated value of a slot, `None` when nothing was recorded.
    pub fn value(&self, variable: MetVariable, index: usize) -> Option<f64> {
        let column = &self.columns[variable.index()];
        match column.counts[index] {
            0 => None,
            n => Some(column.sums[index] / n as f64),
        }
    }

    pub fn qc(&self, variable: MetVariable, index: usize) -> Option<i32> {
        self.columns[variable.index()].qc[index]
    }

    /// QC code is 0 and a value is present.
    pub fn is_good(&self, variable: MetVariable, index: usize) -> bool {
        self.qc(variable, index) == Some(QC_GOOD) && self.value(variable, index).is_some()
    }

    /// Number of slots holding a value for a variable.
    pub fn filled_slots(&self, variable: MetVariable) -> usize {
        self.columns[variable.index()]
            .counts
            .iter()
            .filter(|&&c| c > 0)
            .count()
    }
}
