pub mod correlation_analyzer;

pub use correlation_analyzer::{CorrelationAnalyzer, OutlierPeriod, PairSummary};
