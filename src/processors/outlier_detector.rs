use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CorrelationSample, OutlierRecord, Season};
use crate::utils::constants::{DEFAULT_IQR_MULTIPLIER, DEFAULT_Z_THRESHOLD, MODIFIED_Z_CONSTANT};
use crate::utils::stats::{median_absolute_deviation, percentile, sorted_finite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutlierMethod {
    /// Outside [Q1 - k*IQR, Q3 + k*IQR]
    #[default]
    Iqr,
    /// |0.6745 (v - median) / MAD| above the threshold
    ModifiedZ,
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutlierMethod::Iqr => write!(f, "iqr"),
            OutlierMethod::ModifiedZ => write!(f, "modified-z"),
        }
    }
}

/// How samples are split before thresholds are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One group per season id.
    BySeason,
    /// The whole series is a single group.
    Whole,
}

impl Grouping {
    pub fn for_seasonal(seasonal: bool) -> Self {
        if seasonal {
            Grouping::BySeason
        } else {
            Grouping::Whole
        }
    }
}

/// Closed interval outside which values are flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn excludes(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

pub struct OutlierDetector {
    method: OutlierMethod,
    iqr_multiplier: f64,
    z_threshold: f64,
}

impl OutlierDetector {
    pub fn new(method: OutlierMethod) -> Self {
        Self {
            method,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            z_threshold: DEFAULT_Z_THRESHOLD,
        }
    }

    pub fn with_iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = multiplier;
        self
    }

    pub fn with_z_threshold(mut self, threshold: f64) -> Self {
        self.z_threshold = threshold;
        self
    }

    pub fn method(&self) -> OutlierMethod {
        self.method
    }

    /// IQR bounds of one group, `None` for an empty group.
    pub fn iqr_bounds(&self, values: &[f64]) -> Option<Bounds> {
        let sorted = sorted_finite(values);
        let q1 = percentile(&sorted, 0.25)?;
        let q3 = percentile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(Bounds {
            lower: q1 - self.iqr_multiplier * iqr,
            upper: q3 + self.iqr_multiplier * iqr,
        })
    }

    /// Modified z-scores of one group. A zero MAD leaves the score undefined
    /// and yields `None`, meaning nothing in the group is flagged.
    pub fn modified_z_scores(&self, values: &[f64]) -> Option<Vec<f64>> {
        let (center, mad) = median_absolute_deviation(values)?;
        if mad == 0.0 {
            debug!(points = values.len(), "MAD is zero, no outliers in group");
            return None;
        }
        Some(
            values
                .iter()
                .map(|v| MODIFIED_Z_CONSTANT * (v - center) / mad)
                .collect(),
        )
    }

    /// Per-value outlier flags for one group, aligned with `values`.
    pub fn flag_group(&self, values: &[f64]) -> Vec<bool> {
        match self.method {
            OutlierMethod::Iqr => match self.iqr_bounds(values) {
                Some(bounds) => values.iter().map(|v| bounds.excludes(*v)).collect(),
                None => vec![false; values.len()],
            },
            OutlierMethod::ModifiedZ => match self.modified_z_scores(values) {
                Some(scores) => scores.iter().map(|s| s.abs() > self.z_threshold).collect(),
                None => vec![false; values.len()],
            },
        }
    }

    /// Flag outliers among samples, grouped as requested, returning the
    /// flagged records ordered by year (ties keep input order).
    pub fn detect(&self, samples: &[CorrelationSample], grouping: Grouping) -> Vec<OutlierRecord> {
        let mut groups: BTreeMap<Option<Season>, Vec<usize>> = BTreeMap::new();
        for (i, sample) in samples.iter().enumerate() {
            let key = match grouping {
                Grouping::BySeason => sample.season,
                Grouping::Whole => None,
            };
            groups.entry(key).or_default().push(i);
        }

        let mut flagged: Vec<usize> = Vec::new();
        for (key, indices) in &groups {
            let values: Vec<f64> = indices
                .iter()
                .map(|&i| samples[i].correlation_value)
                .collect();
            let flags = self.flag_group(&values);
            let before = flagged.len();
            flagged.extend(
                indices
                    .iter()
                    .zip(flags)
                    .filter(|(_, flag)| *flag)
                    .map(|(&i, _)| i),
            );
            debug!(
                season = ?key,
                points = values.len(),
                outliers = flagged.len() - before,
                method = %self.method,
                "checked group"
            );
        }

        // Input order first, then a stable sort by year.
        flagged.sort_unstable();
        let mut records: Vec<OutlierRecord> = flagged.into_iter().map(|i| samples[i].clone()).collect();
        records.sort_by_key(|r| r.year);
        records
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(OutlierMethod::default())
    }
}
