pub mod correlation;
pub mod observation;
pub mod resolution;
pub mod season;
pub mod source;
pub mod variable;
pub mod variant;

pub use correlation::{
    pairs_for, CorrelationMatrix, CorrelationSample, MatrixFileName, OutlierRecord, VariablePair,
};
pub use observation::{Observation, Reading};
pub use resolution::Resolution;
pub use season::{days_in_year, Season, SeasonalPartition};
pub use source::SourceMetadata;
pub use variable::{MetVariable, VARIABLE_COUNT};
pub use variant::Variant;
