use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::variable::MetVariable;

/// Which variables take part in a correlation and how precipitation is aligned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Five variables, precipitation excluded.
    NoPrecip,
    /// Six variables, precipitation at the same slot.
    WithPrecip,
    /// Six variables, precipitation read one day ahead of the others.
    WithPrecipLag,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::NoPrecip, Variant::WithPrecip, Variant::WithPrecipLag];

    /// Numeric code used in matrix file names.
    pub fn code(&self) -> u8 {
        match self {
            Variant::NoPrecip => 0,
            Variant::WithPrecip => 1,
            Variant::WithPrecipLag => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Variant::NoPrecip),
            1 => Ok(Variant::WithPrecip),
            2 => Ok(Variant::WithPrecipLag),
            _ => Err(ProcessingError::InvalidFormat(format!(
                "Invalid variant code: {}",
                code
            ))),
        }
    }

    pub fn variables(&self) -> &'static [MetVariable] {
        match self {
            Variant::NoPrecip => &MetVariable::WITHOUT_PRECIP,
            Variant::WithPrecip | Variant::WithPrecipLag => &MetVariable::ALL,
        }
    }

    pub fn includes_precipitation(&self) -> bool {
        !matches!(self, Variant::NoPrecip)
    }

    /// Days precipitation is shifted ahead of the other variables.
    pub fn lag_days(&self) -> usize {
        match self {
            Variant::WithPrecipLag => 1,
            _ => 0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Variant::NoPrecip => "without precipitation",
            Variant::WithPrecip => "with precipitation",
            Variant::WithPrecipLag => "with precipitation, one day lag",
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_codes() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_code(variant.code()).unwrap(), variant);
        }
        assert!(Variant::from_code(3).is_err());
    }

    #[test]
    fn test_variant_variables() {
        assert_eq!(Variant::NoPrecip.variables().len(), 5);
        assert_eq!(Variant::WithPrecip.variables().len(), 6);
        assert_eq!(
            Variant::WithPrecipLag.variables().last(),
            Some(&MetVariable::TbrgPrecipTotalCorr)
        );
        assert_eq!(Variant::WithPrecipLag.lag_days(), 1);
        assert_eq!(Variant::WithPrecip.lag_days(), 0);
        assert!(!Variant::NoPrecip.includes_precipitation());
    }
}
