use chrono::NaiveDate;

use crate::error::{ProcessingError, Result};
use crate::models::{OutlierRecord, VariablePair};
use crate::readers::PairSeries;
use crate::utils::stats::{mean, percentile, sorted_finite};

/// Distribution of one pair's correlation samples, the numbers a violin or
/// box plot of that pair shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSummary {
    pub pair: VariablePair,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl PairSummary {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn summary(&self) -> String {
        format!(
            "{:<45} n={:<4} min={:>7.3} q1={:>7.3} median={:>7.3} q3={:>7.3} max={:>7.3} mean={:>7.3}",
            self.pair.label(),
            self.count,
            self.min,
            self.q1,
            self.median,
            self.q3,
            self.max,
            self.mean
        )
    }
}

/// Date window to highlight for one outlier record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierPeriod {
    pub record: OutlierRecord,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl OutlierPeriod {
    /// The whole calendar year for yearly records, the season otherwise.
    pub fn for_record(record: &OutlierRecord) -> Result<Self> {
        let (start, end) = match record.season {
            Some(season) => season.date_range(record.year)?,
            None => {
                let invalid =
                    || ProcessingError::InvalidFormat(format!("Invalid year: {}", record.year));
                (
                    NaiveDate::from_ymd_opt(record.year, 1, 1).ok_or_else(invalid)?,
                    NaiveDate::from_ymd_opt(record.year, 12, 31).ok_or_else(invalid)?,
                )
            }
        };

        Ok(Self {
            record: record.clone(),
            start,
            end,
        })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

pub struct CorrelationAnalyzer;

impl CorrelationAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Summaries for every pair that has at least one sample.
    pub fn summarize(&self, series: &[PairSeries]) -> Vec<PairSummary> {
        series
            .iter()
            .filter_map(|s| self.summarize_pair(s.pair, &s.values()))
            .collect()
    }

    pub fn summarize_pair(&self, pair: VariablePair, values: &[f64]) -> Option<PairSummary> {
        let sorted = sorted_finite(values);
        Some(PairSummary {
            pair,
            count: sorted.len(),
            min: *sorted.first()?,
            q1: percentile(&sorted, 0.25)?,
            median: percentile(&sorted, 0.5)?,
            q3: percentile(&sorted, 0.75)?,
            max: *sorted.last()?,
            mean: mean(&sorted)?,
        })
    }

    pub fn periods(&self, records: &[OutlierRecord]) -> Result<Vec<OutlierPeriod>> {
        records.iter().map(OutlierPeriod::for_record).collect()
    }

    pub fn generate_summary(&self, summaries: &[PairSummary]) -> String {
        if summaries.is_empty() {
            return "No correlation samples found".to_string();
        }

        let samples: usize = summaries.iter().map(|s| s.count).sum();
        let mut text = format!(
            "Correlation distribution ({} pairs, {} samples)\n",
            summaries.len(),
            samples
        );
        for summary in summaries {
            text.push_str(&summary.summary());
            text.push('\n');
        }

        if let Some(widest) = summaries
            .iter()
            .max_by(|a, b| a.iqr().total_cmp(&b.iqr()))
        {
            text.push_str(&format!(
                "Widest spread: {} (IQR {:.3})",
                widest.pair.label(),
                widest.iqr()
            ));
        }
        text
    }
}

impl Default for CorrelationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{pairs_for, CorrelationSample, MetVariable, Season};

    fn series(values: &[f64]) -> PairSeries {
        let pair = pairs_for(&MetVariable::WITHOUT_PRECIP)[0];
        PairSeries {
            pair,
            samples: values
                .iter()
                .enumerate()
                .map(|(i, v)| CorrelationSample::new(2000 + i as i32, "E11", *v, None))
                .collect(),
        }
    }

    #[test]
    fn test_pair_summary() {
        let analyzer = CorrelationAnalyzer::new();
        let summaries = analyzer.summarize(&[series(&[0.5, 0.1, 0.9, 0.3, 0.7]), series(&[])]);
        assert_eq!(summaries.len(), 1);

        let s = &summaries[0];
        assert_eq!(s.count, 5);
        assert_eq!(s.min, 0.1);
        assert_eq!(s.max, 0.9);
        assert!((s.q1 - 0.3).abs() < 1e-12);
        assert!((s.median - 0.5).abs() < 1e-12);
        assert!((s.q3 - 0.7).abs() < 1e-12);
        assert!((s.mean - 0.5).abs() < 1e-12);

        let text = analyzer.generate_summary(&summaries);
        assert!(text.contains("x1: atmos_pressure & temp_mean"));
        assert!(text.contains("Widest spread"));
    }

    #[test]
    fn test_outlier_periods() {
        let yearly = OutlierPeriod::for_record(&CorrelationSample::new(2016, "E11", 0.1, None)).unwrap();
        assert_eq!(yearly.start, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(yearly.end, NaiveDate::from_ymd_opt(2016, 12, 31).unwrap());
        assert_eq!(yearly.days(), 366);

        let fall = OutlierPeriod::for_record(&CorrelationSample::new(
            2017,
            "E11",
            0.1,
            Some(Season::Fall),
        ))
        .unwrap();
        assert_eq!(fall.start, NaiveDate::from_ymd_opt(2017, 7, 1).unwrap());
        assert_eq!(fall.end, NaiveDate::from_ymd_opt(2017, 9, 30).unwrap());
        assert_eq!(fall.days(), 92);
    }
}
