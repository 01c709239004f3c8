use serde::{Deserialize, Serialize};

use crate::utils::constants::{MINUTES_PER_DAY, SECONDS_PER_DAY, SECONDS_PER_MINUTE};

/// Time resolution of a grid slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    #[default]
    Minute,
    Day,
}

impl Resolution {
    pub fn slot_seconds(&self) -> i64 {
        match self {
            Resolution::Minute => SECONDS_PER_MINUTE,
            Resolution::Day => SECONDS_PER_DAY,
        }
    }

    pub fn slots_per_day(&self) -> usize {
        match self {
            Resolution::Minute => MINUTES_PER_DAY,
            Resolution::Day => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Minute => "per-minute",
            Resolution::Day => "per-day",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
