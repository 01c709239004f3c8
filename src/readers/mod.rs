pub mod matrix_reader;
pub mod observation_reader;
pub mod outlier_reader;
pub mod source_scanner;

pub use matrix_reader::{MatrixReader, PairSeries};
pub use observation_reader::{parse_timestamp, ObservationReader};
pub use outlier_reader::read_outlier_records;
pub use source_scanner::{SourceFile, SourceScanner};
