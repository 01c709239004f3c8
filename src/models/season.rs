use std::ops::Range;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::resolution::Resolution;

/// Calendar quarter used for seasonal correlations. The numeric id is the one
/// written into seasonal file names and outlier records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Season {
    Spring = 0,
    Summer = 1,
    Fall = 2,
    Winter = 3,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    pub fn id(&self) -> u8 {
        *self as u8
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Season::Spring),
            1 => Ok(Season::Summer),
            2 => Ok(Season::Fall),
            3 => Ok(Season::Winter),
            _ => Err(ProcessingError::InvalidFormat(format!(
                "Invalid season id: {}",
                id
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }

    /// Last calendar month of the season.
    fn end_month(&self) -> u32 {
        3 * (self.id() as u32 + 1)
    }

    /// Zero-based day-of-year indices covered by the season.
    pub fn day_range(&self, year: i32) -> Range<usize> {
        let start = days_through_month(year, self.end_month() - 3);
        let end = days_through_month(year, self.end_month());
        start..end
    }

    /// First and last calendar dates of the season.
    pub fn date_range(&self, year: i32) -> Result<(NaiveDate, NaiveDate)> {
        let days = self.day_range(year);
        let date = |ordinal: usize| {
            NaiveDate::from_yo_opt(year, ordinal as u32).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!("Year {} is outside the calendar", year))
            })
        };
        Ok((date(days.start + 1)?, date(days.end)?))
    }
}

impl From<Season> for u8 {
    fn from(season: Season) -> Self {
        season.id()
    }
}

impl TryFrom<u8> for Season {
    type Error = ProcessingError;

    fn try_from(id: u8) -> Result<Self> {
        Season::from_id(id)
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Days from Jan 1 through the end of `month` (0 gives 0). Years outside the
/// calendar give an empty span.
fn days_through_month(year: i32, month: u32) -> usize {
    let next = if month >= 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (NaiveDate::from_ymd_opt(year, 1, 1), next) {
        (Some(jan1), Some(next)) => (next - jan1).num_days() as usize,
        _ => 0,
    }
}

pub fn days_in_year(year: i32) -> usize {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|d| d.ordinal() as usize)
        .unwrap_or(0)
}

/// The four contiguous slot ranges of one year at a given resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonalPartition {
    pub year: i32,
    pub resolution: Resolution,
    ranges: [Range<usize>; 4],
}

impl SeasonalPartition {
    pub fn for_year(year: i32, resolution: Resolution) -> Self {
        let per_day = resolution.slots_per_day();
        let ranges = Season::ALL.map(|season| {
            let days = season.day_range(year);
            days.start * per_day..days.end * per_day
        });

        Self {
            year,
            resolution,
            ranges,
        }
    }

    pub fn range(&self, season: Season) -> Range<usize> {
        self.ranges[season.id() as usize].clone()
    }

    /// Season range cut to the first `len` slots (used for lagged masks that
    /// end one day early).
    pub fn clipped_range(&self, season: Season, len: usize) -> Range<usize> {
        let range = self.range(season);
        range.start.min(len)..range.end.min(len)
    }

    pub fn day_counts(&self) -> [usize; 4] {
        Season::ALL.map(|season| season.day_range(self.year).len())
    }

    pub fn season_of_slot(&self, slot: usize) -> Option<Season> {
        Season::ALL
            .into_iter()
            .find(|season| self.range(*season).contains(&slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_in_year() {
        assert_eq!(days_in_year(2016), 366);
        assert_eq!(days_in_year(2017), 365);
        assert_eq!(days_in_year(2000), 366);
        assert_eq!(days_in_year(1900), 365);
    }

    #[test]
    fn test_days_through_month() {
        assert_eq!(days_through_month(2016, 0), 0);
        assert_eq!(days_through_month(2016, 2), 60);
        assert_eq!(days_through_month(2017, 2), 59);
        assert_eq!(days_through_month(2016, 12), 366);
        assert_eq!(days_through_month(2100, 12), 365);
        assert_eq!(Season::Winter.day_range(2016), 274..366);
    }

    #[test]
    fn test_partition_sums_to_year_length() {
        let leap = SeasonalPartition::for_year(2016, Resolution::Day);
        assert_eq!(leap.day_counts(), [91, 91, 92, 92]);
        assert_eq!(leap.day_counts().iter().sum::<usize>(), 366);

        let common = SeasonalPartition::for_year(2017, Resolution::Day);
        assert_eq!(common.day_counts(), [90, 91, 92, 92]);
        assert_eq!(common.day_counts().iter().sum::<usize>(), 365);
    }

    #[test]
    fn test_partition_ranges_are_contiguous() {
        let partition = SeasonalPartition::for_year(2017, Resolution::Minute);
        assert_eq!(partition.range(Season::Spring).start, 0);
        for pair in Season::ALL.windows(2) {
            assert_eq!(partition.range(pair[0]).end, partition.range(pair[1]).start);
        }
        assert_eq!(partition.range(Season::Winter).end, 365 * 1440);
        assert_eq!(partition.range(Season::Summer), 90 * 1440..181 * 1440);
    }

    #[test]
    fn test_season_of_slot() {
        let partition = SeasonalPartition::for_year(2016, Resolution::Day);
        assert_eq!(partition.season_of_slot(0), Some(Season::Spring));
        assert_eq!(partition.season_of_slot(90), Some(Season::Spring)); // Mar 31
        assert_eq!(partition.season_of_slot(91), Some(Season::Summer)); // Apr 1
        assert_eq!(partition.season_of_slot(365), Some(Season::Winter));
        assert_eq!(partition.season_of_slot(366), None);
    }

    #[test]
    fn test_clipped_range_for_lag() {
        let partition = SeasonalPartition::for_year(2017, Resolution::Day);
        assert_eq!(partition.clipped_range(Season::Winter, 364), 273..364);
        assert_eq!(partition.clipped_range(Season::Spring, 364), 0..90);
    }

    #[test]
    fn test_season_dates() {
        let (start, end) = Season::Summer.date_range(2016).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2016, 4, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2016, 6, 30).unwrap());

        let (start, _) = Season::Spring.date_range(2016).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
    }

    #[test]
    fn test_season_ids() {
        assert_eq!(Season::from_id(2).unwrap(), Season::Fall);
        assert!(Season::from_id(4).is_err());
        assert_eq!(u8::from(Season::Winter), 3);
    }
}
