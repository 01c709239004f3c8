use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{MetVariable, Variant};
use crate::processors::grid_aligner::Grid;

/// Whether a precipitation value of exactly zero invalidates a slot, kept as
/// a separate flag per precipitation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecipZeroRule {
    pub with_precip: bool,
    pub with_precip_lag: bool,
}

impl Default for PrecipZeroRule {
    fn default() -> Self {
        Self {
            with_precip: true,
            with_precip_lag: true,
        }
    }
}

impl PrecipZeroRule {
    pub fn excludes_zero(&self, variant: Variant) -> bool {
        match variant {
            Variant::NoPrecip => false,
            Variant::WithPrecip => self.with_precip,
            Variant::WithPrecipLag => self.with_precip_lag,
        }
    }
}

/// Per-slot validity for one variant. For lagged variants the mask is one day
/// shorter than the grid and precipitation is read `lag_slots` ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    variant: Variant,
    lag_slots: usize,
    bits: Vec<bool>,
}

impl ValidityMask {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn lag_slots(&self) -> usize {
        self.lag_slots
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    pub fn valid_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn valid_indices(&self, range: Range<usize>) -> impl Iterator<Item = usize> + '_ {
        let end = range.end.min(self.bits.len());
        (range.start.min(end)..end).filter(move |&i| self.bits[i])
    }
}

/// Builds validity masks and co-filtered series from a grid.
pub struct QcMaskCombiner {
    zero_rule: PrecipZeroRule,
}

impl QcMaskCombiner {
    pub fn new() -> Self {
        Self {
            zero_rule: PrecipZeroRule::default(),
        }
    }

    pub fn with_zero_rule(zero_rule: PrecipZeroRule) -> Self {
        Self { zero_rule }
    }

    /// Valid at `i` iff every required QC code is 0 with a value present and,
    /// for precipitation variants, precipitation at `i + lag` passes QC (and is
    /// non-zero when the variant excludes zero).
    pub fn combine(&self, grid: &Grid, variant: Variant) -> ValidityMask {
        let lag_slots = variant.lag_days() * grid.slots_per_day();
        let len = grid.len().saturating_sub(lag_slots);
        let exclude_zero = self.zero_rule.excludes_zero(variant);

        let bits: Vec<bool> = (0..len)
            .map(|i| {
                variant.variables().iter().all(|&variable| {
                    if variable.is_precipitation() {
                        let j = i + lag_slots;
                        grid.is_good(variable, j)
                            && !(exclude_zero && grid.value(variable, j) == Some(0.0))
                    } else {
                        grid.is_good(variable, i)
                    }
                })
            })
            .collect();

        let mask = ValidityMask {
            variant,
            lag_slots,
            bits,
        };
        debug!(
            variant = %variant,
            len = mask.len(),
            valid = mask.valid_count(),
            "combined QC mask"
        );
        mask
    }

    /// Values at valid indices only, one series per variant variable, all of
    /// equal length. Precipitation is read `lag_slots` ahead.
    pub fn co_filter(
        &self,
        grid: &Grid,
        mask: &ValidityMask,
        range: Range<usize>,
    ) -> Vec<(MetVariable, Vec<f64>)> {
        let indices: Vec<usize> = mask.valid_indices(range).collect();

        mask.variant()
            .variables()
            .iter()
            .map(|&variable| {
                let offset = if variable.is_precipitation() {
                    mask.lag_slots()
                } else {
                    0
                };
                let values = indices
                    .iter()
                    .filter_map(|&i| grid.value(variable, i + offset))
                    .collect();
                (variable, values)
            })
            .collect()
    }
}

impl Default for QcMaskCombiner {
    fn default() -> Self {
        Self::new()
    }
}
