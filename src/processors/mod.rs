pub mod batch;
pub mod correlation;
pub mod daily;
pub mod grid_aligner;
pub mod normalizer;
pub mod outlier_detector;
pub mod pipeline;
pub mod qc_mask;

pub use batch::{BatchProcessor, BatchReport, UnitOutcome, UnitStatus};
pub use correlation::{correlation_matrix, pearson};
pub use daily::{build_daily_series, daily_rows, DailyRow};
pub use grid_aligner::Grid;
pub use normalizer::{normalize, normalize_all};
pub use outlier_detector::{Bounds, Grouping, OutlierDetector, OutlierMethod};
pub use pipeline::{CorrelationPipeline, DegeneratePolicy, MatrixResult, UnitResult};
pub use qc_mask::{PrecipZeroRule, QcMaskCombiner, ValidityMask};
