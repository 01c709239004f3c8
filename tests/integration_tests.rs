use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use sgpmet_processor::analyzers::CorrelationAnalyzer;
use sgpmet_processor::models::{
    CorrelationMatrix, MatrixFileName, MetVariable, Observation, Reading, Resolution, Season,
    Variant,
};
use sgpmet_processor::processors::{
    build_daily_series, BatchProcessor, CorrelationPipeline, DegeneratePolicy, Grid, Grouping,
    OutlierDetector, OutlierMethod, QcMaskCombiner, UnitStatus,
};
use sgpmet_processor::readers::{read_outlier_records, MatrixReader};
use sgpmet_processor::writers::CsvWriter;

/// Deterministic noise in [-0.5, 0.5).
fn noise(seed: u64) -> f64 {
    let mut x = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    (x % 10_000) as f64 / 10_000.0 - 0.5
}

/// Plausible values for step `i`: pressure falls as temperature rises.
fn synthetic_values(i: u64, constant_temp: bool) -> [f64; 6] {
    let phase = i as f64 / 365.0 * std::f64::consts::TAU;
    let temp = if constant_temp {
        15.0
    } else {
        12.0 + 10.0 * phase.sin() + noise(i)
    };
    [
        101.0 - 0.2 * temp + 0.1 * noise(i + 1),
        temp,
        60.0 + 10.0 * noise(i + 2) + (i % 7) as f64,
        1.0 + 0.05 * temp + 0.1 * noise(i + 3),
        3.0 + (i % 5) as f64 * 0.5 + noise(i + 4),
        0.2 + (i % 4) as f64 * 0.3,
    ]
}

fn header() -> String {
    let mut columns = vec!["time".to_string()];
    for variable in MetVariable::ALL {
        columns.push(variable.name().to_string());
        columns.push(variable.qc_name().to_string());
    }
    columns.join(",")
}

/// One export per month of `year`, one observation per day at noon.
fn write_year(dir: &Path, instrument: &str, year: i32, constant_temp: bool) {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let mut files: Vec<(u32, String)> = (1..=12).map(|m| (m, header() + "\n")).collect();

    let mut date = start;
    let mut i = 0u64;
    while date.year() == year {
        let values = synthetic_values(i, constant_temp);
        let mut line = format!("{} 12:00:00", date.format("%Y-%m-%d"));
        for value in values {
            write!(line, ",{},0", value).unwrap();
        }
        let body = &mut files[date.month0() as usize].1;
        body.push_str(&line);
        body.push('\n');

        date += Duration::days(1);
        i += 1;
    }

    for (month, body) in files {
        let name = format!("sgpmet{}.b1.{}{:02}01.000000.csv", instrument, year, month);
        fs::write(dir.join(name), body).unwrap();
    }
}

#[test]
fn test_minute_grid_correlation() {
    let mut grid = Grid::new(2016, Resolution::Minute).unwrap();
    let origin = NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let minutes = 366 * 1440u64;
    assert_eq!(grid.len() as u64, minutes);

    // A full leap year of minutes with temp_mean a noisy multiple of atmos_pressure.
    for minute in 0..minutes {
        let a = (minute as f64 / 300.0).sin() * 5.0 + 100.0;
        let b = 2.0 * a + 0.5 * noise(minute);
        let mut observation = Observation::new(origin + Duration::minutes(minute as i64));
        for variable in MetVariable::ALL {
            let value = 1.0 + noise(minute * 7 + variable.index() as u64);
            observation.set_reading(variable, Reading::good(value));
        }
        observation.set_reading(MetVariable::AtmosPressure, Reading::good(a));
        observation.set_reading(MetVariable::TempMean, Reading::good(b));
        grid.insert(&observation).unwrap();
    }
    assert_eq!(grid.observation_count() as u64, minutes);

    let pipeline = CorrelationPipeline::new(Resolution::Minute)
        .with_variants(vec![Variant::NoPrecip, Variant::WithPrecipLag]);
    let unit = pipeline.run_grid(&grid, "E11").unwrap();
    assert_eq!(unit.matrices.len(), 2);

    let yearly = &unit.matrices[0];
    assert_eq!(yearly.points, 527_040);
    assert_eq!(yearly.file_name.to_filename(), "E112016.0.csv");

    let lagged = &unit.matrices[1];
    assert_eq!(lagged.points, 527_040 - 1440);
    assert_eq!(lagged.file_name.to_filename(), "E112016.2.csv");

    for result in &unit.matrices {
        let matrix = &result.matrix;
        assert!(matrix.is_symmetric(1e-12));
        for i in 0..matrix.size() {
            assert_eq!(matrix.get(i, i), Some(1.0));
        }
        let r = matrix
            .between(MetVariable::AtmosPressure, MetVariable::TempMean)
            .unwrap();
        assert!(r > 0.9, "r = {}", r);
    }
}

#[test]
fn test_lag_mask_skips_last_day() {
    let mut grid = Grid::new(2016, Resolution::Minute).unwrap();
    let last_day = NaiveDate::from_ymd_opt(2016, 12, 31)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let mut observation = Observation::new(last_day);
    for variable in MetVariable::ALL {
        observation.set_reading(variable, Reading::good(1.0));
    }
    grid.insert(&observation).unwrap();

    let combiner = QcMaskCombiner::new();
    let lagged = combiner.combine(&grid, Variant::WithPrecipLag);
    let same_slot = combiner.combine(&grid, Variant::WithPrecip);

    assert_eq!(lagged.len(), 366 * 1440 - 1440);
    assert_eq!(lagged.valid_count(), 0);
    assert_eq!(same_slot.valid_count(), 1);
}

#[test]
fn test_source_files_to_matrices_and_back() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_year(input.path(), "E11", 2015, false);
    // Another instrument in the same directory is ignored.
    write_year(input.path(), "E13", 2015, true);

    let pipeline = CorrelationPipeline::new(Resolution::Day);
    let unit = pipeline.run_unit(input.path(), "E11", 2015).unwrap();
    assert_eq!(unit.observations, 365);
    assert_eq!(unit.matrices.len(), 3);

    let lagged = unit
        .matrices
        .iter()
        .find(|m| m.file_name.variant == Variant::WithPrecipLag)
        .unwrap();
    assert_eq!(lagged.points, 364);
    assert_eq!(lagged.matrix.size(), 6);

    let yearly = &unit.matrices[0].matrix;
    let r = yearly
        .between(MetVariable::AtmosPressure, MetVariable::TempMean)
        .unwrap();
    assert!(r < -0.9, "r = {}", r);

    let files = CsvWriter::new().write_unit(&unit, output.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["E112015.0.csv", "E112015.1.csv", "E112015.2.csv"]);

    let read_back = MatrixReader::new().read_matrix(&files[0]).unwrap();
    assert_eq!(read_back.variables(), Variant::NoPrecip.variables());
    let stored = read_back
        .between(MetVariable::AtmosPressure, MetVariable::TempMean)
        .unwrap();
    assert!((stored - r).abs() < 1e-6);

    let series = MatrixReader::new()
        .collect_samples(output.path(), "E11", Variant::NoPrecip, false)
        .unwrap();
    assert_eq!(series.len(), 10);
    assert!(series.iter().all(|s| s.samples.len() == 1));
}

#[test]
fn test_seasonal_matrices_cover_the_year() {
    let input = TempDir::new().unwrap();
    write_year(input.path(), "E11", 2016, false);

    let pipeline = CorrelationPipeline::new(Resolution::Day)
        .with_variants(vec![Variant::NoPrecip])
        .with_seasonal(true);
    let unit = pipeline.run_unit(input.path(), "E11", 2016).unwrap();

    let points: Vec<usize> = unit.matrices.iter().map(|m| m.points).collect();
    // 2016 is a leap year: Jan-Mar 91 days, then 91, 92, 92.
    assert_eq!(points, vec![91, 91, 92, 92]);
    assert_eq!(points.iter().sum::<usize>(), 366);

    let seasons: Vec<Option<Season>> = unit.matrices.iter().map(|m| m.file_name.season).collect();
    assert_eq!(
        seasons,
        vec![
            Some(Season::Spring),
            Some(Season::Summer),
            Some(Season::Fall),
            Some(Season::Winter)
        ]
    );
    assert_eq!(unit.matrices[2].file_name.to_filename(), "E112016.2.0.csv");
}

#[test]
fn test_degenerate_policies() {
    let input = TempDir::new().unwrap();
    write_year(input.path(), "E11", 2017, true);

    let abort = CorrelationPipeline::new(Resolution::Day).with_variants(vec![Variant::NoPrecip]);
    let err = abort.run_unit(input.path(), "E11", 2017).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("E11 2017"), "{}", message);
    assert!(message.contains("temp_mean"), "{}", message);

    let skip = abort.with_degenerate_policy(DegeneratePolicy::Skip);
    let unit = skip.run_unit(input.path(), "E11", 2017).unwrap();
    let result = &unit.matrices[0];
    assert_eq!(result.skipped, vec![MetVariable::TempMean]);
    assert_eq!(
        result.matrix.between(MetVariable::TempMean, MetVariable::RhMean),
        None
    );
    assert_eq!(
        result.matrix.between(MetVariable::AtmosPressure, MetVariable::AtmosPressure),
        Some(1.0)
    );
    assert!(result
        .matrix
        .between(MetVariable::AtmosPressure, MetVariable::RhMean)
        .is_some());

    let output = TempDir::new().unwrap();
    let files = CsvWriter::new().write_unit(&unit, output.path()).unwrap();
    let text = fs::read_to_string(&files[0]).unwrap();
    assert!(text.lines().nth(2).unwrap().contains("nan"));
}

#[test]
fn test_batch_isolates_failures() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_year(input.path(), "E11", 2015, false);
    write_year(input.path(), "E11", 2016, true);
    fs::write(
        input.path().join("sgpmetE11.b1.20180101.000000.csv"),
        "time,atmos_pressure\n2018-01-01 00:00:00,100.0\n",
    )
    .unwrap();

    let pipeline = CorrelationPipeline::new(Resolution::Day);
    let report = BatchProcessor::new(2, pipeline)
        .process_years(input.path(), output.path(), "E11", 2015..=2018, false, None)
        .unwrap();

    let years: Vec<i32> = report.units.iter().map(|u| u.year).collect();
    assert_eq!(years, vec![2015, 2016, 2017, 2018]);
    assert_eq!(report.completed(), 1);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.without_data(), 1);
    assert_eq!(report.files_written(), 3);

    match &report.units[1].status {
        UnitStatus::Failed { error } => assert!(error.starts_with("E11 2016:"), "{}", error),
        other => panic!("unexpected status {:?}", other),
    }
    match &report.units[3].status {
        UnitStatus::Failed { error } => assert!(error.contains("missing column"), "{}", error),
        other => panic!("unexpected status {:?}", other),
    }
    assert!(output.path().join("E112015.2.csv").exists());
    assert!(!output.path().join("E112016.0.csv").exists());
}

#[test]
fn test_outliers_from_stored_matrices() {
    let dir = TempDir::new().unwrap();
    let writer = CsvWriter::new();
    let variables = Variant::NoPrecip.variables().to_vec();

    for year in 2000..2012 {
        let r = if year == 2007 { -0.8 } else { 0.5 + 0.01 * (year % 4) as f64 };
        let mut matrix = CorrelationMatrix::undefined(variables.clone());
        for i in 0..variables.len() {
            for j in 0..variables.len() {
                matrix.set(i, j, Some(if i == j { 1.0 } else { r }));
            }
        }
        let name = MatrixFileName::new("E11", year, None, Variant::NoPrecip);
        writer
            .write_matrix(&matrix, &dir.path().join(name.to_filename()))
            .unwrap();
    }

    let series = MatrixReader::new()
        .collect_samples(dir.path(), "E11", Variant::NoPrecip, false)
        .unwrap();
    assert_eq!(series.len(), 10);
    assert_eq!(series[0].samples.len(), 12);

    for method in [OutlierMethod::Iqr, OutlierMethod::ModifiedZ] {
        let records = OutlierDetector::new(method).detect(&series[0].samples, Grouping::Whole);
        let years: Vec<i32> = records.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2007], "method {}", method);
    }

    let records = OutlierDetector::default().detect(&series[0].samples, Grouping::Whole);
    let path = dir.path().join("outliers.csv");
    writer.write_outliers(&records, false, &path).unwrap();
    let read_back = read_outlier_records(&path).unwrap();
    assert_eq!(read_back, records);

    let periods = CorrelationAnalyzer::new().periods(&read_back).unwrap();
    assert_eq!(periods[0].start, NaiveDate::from_ymd_opt(2007, 1, 1).unwrap());
    assert_eq!(periods[0].end, NaiveDate::from_ymd_opt(2007, 12, 31).unwrap());

    let summaries = CorrelationAnalyzer::new().summarize(&series);
    assert_eq!(summaries.len(), 10);
    assert_eq!(summaries[0].count, 12);
    assert_eq!(summaries[0].min, -0.8);
}

#[test]
fn test_daily_series_keeps_gap_years() {
    let input = TempDir::new().unwrap();
    write_year(input.path(), "E11", 2014, false);
    write_year(input.path(), "E11", 2016, false);

    let rows = build_daily_series(input.path(), "E11", 2014, 2016, None).unwrap();
    assert_eq!(rows.len(), 365 + 365 + 366);

    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    for pair in dates.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::days(1));
    }
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2014, 1, 1).unwrap());
    assert_eq!(rows[365].date, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    assert_eq!(rows[1095].date, NaiveDate::from_ymd_opt(2016, 12, 31).unwrap());

    assert_eq!(rows[0].value(MetVariable::TempMean), Some(synthetic_values(0, false)[1]));
    assert!(rows[365..730]
        .iter()
        .all(|r| r.values.iter().all(Option::is_none)));
    assert!(rows[730].value(MetVariable::TempMean).is_some());
}
