pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod stats;

pub use constants::*;
pub use progress::ProgressReporter;
