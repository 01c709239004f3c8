use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::error::Result;
use crate::models::Resolution;
use crate::processors::{DegeneratePolicy, OutlierDetector, OutlierMethod, PrecipZeroRule};
use crate::utils::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_IQR_MULTIPLIER, DEFAULT_Z_THRESHOLD, ENV_PREFIX,
};

/// Processing settings from `sgpmet.toml` and `SGPMET_*` environment
/// variables. Command-line flags take precedence over both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub resolution: Resolution,
    pub degenerate_policy: DegeneratePolicy,
    #[validate(range(min = 1, max = 1024))]
    pub max_workers: usize,
    #[validate(nested)]
    pub precip: PrecipSettings,
    #[validate(nested)]
    pub outliers: OutlierSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            resolution: Resolution::default(),
            degenerate_policy: DegeneratePolicy::default(),
            max_workers: num_cpus::get(),
            precip: PrecipSettings::default(),
            outliers: OutlierSettings::default(),
        }
    }
}

/// Whether exactly-zero precipitation invalidates a slot, per variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct PrecipSettings {
    pub zero_excluded_with_precip: bool,
    pub zero_excluded_with_lag: bool,
}

impl Default for PrecipSettings {
    fn default() -> Self {
        Self {
            zero_excluded_with_precip: true,
            zero_excluded_with_lag: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct OutlierSettings {
    #[validate(range(exclusive_min = 0.0))]
    pub iqr_multiplier: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub z_threshold: f64,
}

impl Default for OutlierSettings {
    fn default() -> Self {
        Self {
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            z_threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

impl Settings {
    /// Load settings. An explicit file must exist; the default
    /// `sgpmet.toml` in the working directory is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!(?settings, "loaded settings");
        Ok(settings)
    }

    pub fn zero_rule(&self) -> PrecipZeroRule {
        PrecipZeroRule {
            with_precip: self.precip.zero_excluded_with_precip,
            with_precip_lag: self.precip.zero_excluded_with_lag,
        }
    }

    pub fn outlier_detector(&self, method: OutlierMethod) -> OutlierDetector {
        OutlierDetector::new(method)
            .with_iqr_multiplier(self.outliers.iqr_multiplier)
            .with_z_threshold(self.outliers.z_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.zero_rule(), PrecipZeroRule::default());
        assert_eq!(settings.resolution, Resolution::Minute);
        assert_eq!(settings.degenerate_policy, DegeneratePolicy::Abort);
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("sgpmet.toml");
        fs::write(
            &path,
            "resolution = \"day\"\n\
             degenerate_policy = \"skip\"\n\
             max_workers = 3\n\
             [precip]\n\
             zero_excluded_with_lag = false\n\
             [outliers]\n\
             iqr_multiplier = 3.0\n",
        )?;

        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings.resolution, Resolution::Day);
        assert_eq!(settings.degenerate_policy, DegeneratePolicy::Skip);
        assert_eq!(settings.max_workers, 3);
        assert!(settings.precip.zero_excluded_with_precip);
        assert!(!settings.zero_rule().with_precip_lag);
        assert_eq!(settings.outliers.iqr_multiplier, 3.0);
        assert_eq!(settings.outliers.z_threshold, DEFAULT_Z_THRESHOLD);
        Ok(())
    }

    #[test]
    fn test_invalid_settings_are_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[outliers]\nz_threshold = 0.0\n")?;
        assert!(Settings::load(Some(&path)).is_err());

        fs::write(&path, "max_workers = 0\n")?;
        assert!(Settings::load(Some(&path)).is_err());

        let missing = dir.path().join("absent.toml");
        assert!(Settings::load(Some(&missing)).is_err());
        Ok(())
    }
}
