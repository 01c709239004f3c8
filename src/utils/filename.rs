use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

use crate::models::Variant;
use crate::processors::OutlierMethod;

fn shape(seasonal: bool) -> &'static str {
    if seasonal {
        "seasonal"
    } else {
        "yearly"
    }
}

/// Outlier records: `{instrument}.{variant}.{yearly|seasonal}.{method}.outliers.csv`
pub fn outlier_filename(
    output_dir: &Path,
    instrument_id: &str,
    variant: Variant,
    seasonal: bool,
    method: OutlierMethod,
) -> PathBuf {
    output_dir.join(format!(
        "{}.{}.{}.{}.outliers.csv",
        instrument_id,
        variant.code(),
        shape(seasonal),
        method
    ))
}

/// Pair distribution summary: `{instrument}.{variant}.{yearly|seasonal}.summary.csv`
pub fn summary_filename(output_dir: &Path, instrument_id: &str, variant: Variant, seasonal: bool) -> PathBuf {
    output_dir.join(format!(
        "{}.{}.{}.summary.csv",
        instrument_id,
        variant.code(),
        shape(seasonal)
    ))
}

/// Per-day series: `{instrument}.daily.{begin}-{end}.csv`
pub fn daily_filename(output_dir: &Path, instrument_id: &str, begin_year: i32, end_year: i32) -> PathBuf {
    output_dir.join(format!(
        "{}.daily.{}-{}.csv",
        instrument_id, begin_year, end_year
    ))
}

/// Outlier periods derived from an outlier file: `{stem}.periods.csv` next to it.
pub fn periods_filename(input_file: &Path) -> PathBuf {
    let stem = input_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "outliers".to_string());
    input_file.with_file_name(format!("{}.periods.csv", stem))
}

/// Batch report with format: sgpmet-report-{instrument}-{YYMMDD}.json
pub fn report_filename(output_dir: &Path, instrument_id: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100;

    output_dir.join(format!(
        "sgpmet-report-{}-{:02}{:02}{:02}.json",
        instrument_id,
        year,
        now.month(),
        now.day()
    ))
}
