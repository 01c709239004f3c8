/// Source file naming
pub const SOURCE_FILE_PREFIX: &str = "sgpmet";
pub const SOURCE_FILE_EXTENSION: &str = "csv";
pub const MATRIX_FILE_EXTENSION: &str = "csv";

/// Observation export columns
pub const TIME_COLUMN: &str = "time";

/// Calendar arithmetic
pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const MINUTES_PER_DAY: usize = 1440;
pub const MIN_SUPPORTED_YEAR: i32 = 1900;
pub const MAX_SUPPORTED_YEAR: i32 = 2100;

/// Quality control
pub const QC_GOOD: i32 = 0;
pub const MISSING_VALUE: f64 = -9999.0;

/// Outlier detection defaults
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_Z_THRESHOLD: f64 = 3.5;
pub const MODIFIED_Z_CONSTANT: f64 = 0.6745;

/// Output formatting
pub const MATRIX_DECIMALS: usize = 6;
pub const UNDEFINED_ENTRY: &str = "nan";

/// Floating point tolerance for matrix invariants
pub const MATRIX_TOLERANCE: f64 = 1e-9;

/// Configuration
pub const DEFAULT_CONFIG_FILE: &str = "sgpmet.toml";
pub const ENV_PREFIX: &str = "SGPMET";
