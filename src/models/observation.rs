use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::variable::{MetVariable, VARIABLE_COUNT};
use crate::utils::constants::{MISSING_VALUE, QC_GOOD};

/// One measured value with its quality-control code.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub value: Option<f64>,
    pub qc: Option<i32>,
}

impl Reading {
    pub fn new(value: Option<f64>, qc: Option<i32>) -> Self {
        Self {
            value: value.filter(|v| is_present(*v)),
            qc,
        }
    }

    /// A reading with QC code 0.
    pub fn good(value: f64) -> Self {
        Self::new(Some(value), Some(QC_GOOD))
    }

    pub fn flagged(value: f64, qc: i32) -> Self {
        Self::new(Some(value), Some(qc))
    }

    pub fn missing() -> Self {
        Self::default()
    }

    pub fn has_good_qc(&self) -> bool {
        self.qc == Some(QC_GOOD)
    }

    /// Value usable for aggregation: present and QC 0.
    pub fn usable_value(&self) -> Option<f64> {
        if self.has_good_qc() {
            self.value
        } else {
            None
        }
    }
}

/// Decoded values are dropped when NaN, infinite or the ARM fill value.
fn is_present(value: f64) -> bool {
    value.is_finite() && value != MISSING_VALUE
}

/// One timestamped row of an sgpmet observation export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub readings: [Reading; VARIABLE_COUNT],
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            readings: [Reading::missing(); VARIABLE_COUNT],
        }
    }

    pub fn with_reading(mut self, variable: MetVariable, reading: Reading) -> Self {
        self.readings[variable.index()] = reading;
        self
    }

    pub fn reading(&self, variable: MetVariable) -> &Reading {
        &self.readings[variable.index()]
    }

    pub fn set_reading(&mut self, variable: MetVariable, reading: Reading) {
        self.readings[variable.index()] = reading;
    }

    /// Number of variables whose reading passed QC.
    pub fn good_count(&self) -> usize {
        self.readings
            .iter()
            .filter(|r| r.usable_value().is_some())
            .count()
    }
}
