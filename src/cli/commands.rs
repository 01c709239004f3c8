use std::path::{Path, PathBuf};

use tracing::info;

use crate::analyzers::CorrelationAnalyzer;
use crate::cli::args::{Cli, Commands, CorrelationArgs, MatrixArgs};
use crate::config::Settings;
use crate::error::{ProcessingError, Result};
use crate::processors::{
    build_daily_series, BatchProcessor, CorrelationPipeline, Grouping, OutlierMethod,
};
use crate::readers::{read_outlier_records, MatrixReader, PairSeries, SourceScanner};
use crate::utils::filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    let silent = cli.verbose == 0 && cli.log_file.is_none();

    match cli.command {
        Commands::Correlate { options, year } => {
            let pipeline = build_pipeline(&options, &settings);
            let output_dir = options.output_dir.as_deref().unwrap_or(&settings.output_dir);

            println!(
                "Correlating {} {} ({} resolution)",
                options.instrument,
                year,
                pipeline.resolution()
            );
            println!("Input directory: {}", options.input_dir.display());

            let progress = ProgressReporter::new_spinner("Reading observations...", silent);
            let unit = match pipeline.run_unit(&options.input_dir, &options.instrument, year) {
                Ok(unit) => unit,
                Err(e) => {
                    progress.finish_and_clear();
                    return Err(e);
                }
            };
            progress.finish_with_message(&format!("Read {} observations", unit.observations));

            let files = CsvWriter::new().write_unit(&unit, output_dir)?;
            for result in &unit.matrices {
                if result.skipped.is_empty() {
                    println!("  {} ({} points)", result.file_name.to_filename(), result.points);
                } else {
                    let names: Vec<&str> = result.skipped.iter().map(|v| v.name()).collect();
                    println!(
                        "  {} ({} points, undefined: {})",
                        result.file_name.to_filename(),
                        result.points,
                        names.join(", ")
                    );
                }
            }
            println!("Wrote {} matrix files to {}", files.len(), output_dir.display());
        }

        Commands::ProcessDirectory {
            options,
            begin_year,
            end_year,
            max_workers,
            report,
        } => {
            let (begin_year, end_year) =
                year_span(&options.input_dir, &options.instrument, begin_year, end_year)?;
            let pipeline = build_pipeline(&options, &settings);
            let output_dir = options.output_dir.as_deref().unwrap_or(&settings.output_dir);
            let max_workers = max_workers.unwrap_or(settings.max_workers);

            println!(
                "Processing {} {}-{} with {} workers",
                options.instrument, begin_year, end_year, max_workers
            );
            println!("Input directory: {}", options.input_dir.display());
            println!("Output directory: {}", output_dir.display());

            let units = (end_year - begin_year + 1) as u64;
            let progress = ProgressReporter::new(units, "Processing units...", silent);
            let processor = BatchProcessor::new(max_workers, pipeline);
            let batch = processor.process_years(
                &options.input_dir,
                output_dir,
                &options.instrument,
                begin_year..=end_year,
                options.seasonal,
                Some(&progress),
            )?;

            println!("\n{}", batch.generate_summary());

            let report_path = report
                .unwrap_or_else(|| filename::report_filename(output_dir, &options.instrument));
            CsvWriter::new().write_json(&batch, &report_path)?;
            println!("Report written to {}", report_path.display());
        }

        Commands::Daily {
            input_dir,
            instrument,
            begin_year,
            end_year,
            output_file,
        } => {
            check_year_span(begin_year, end_year)?;
            let output_file = output_file.unwrap_or_else(|| {
                filename::daily_filename(&settings.output_dir, &instrument, begin_year, end_year)
            });

            let years = (end_year - begin_year + 1) as u64;
            let progress = ProgressReporter::new(years, "Building daily series...", silent);
            let rows = build_daily_series(
                &input_dir,
                &instrument,
                begin_year,
                end_year,
                Some(&progress),
            )?;
            progress.finish_with_message(&format!("Built {} days", rows.len()));

            if rows.iter().all(|r| r.values.iter().all(Option::is_none)) {
                println!("No observations found for {} {}-{}", instrument, begin_year, end_year);
                return Ok(());
            }

            CsvWriter::new().write_daily_series(&rows, &output_file)?;
            println!("Wrote {} days to {}", rows.len(), output_file.display());
        }

        Commands::Outliers {
            matrices,
            method,
            output_dir,
        } => {
            let output_dir = output_dir.as_deref().unwrap_or(&settings.output_dir);
            let detector = settings.outlier_detector(method);
            let reader = MatrixReader::new();
            let series = collect(&reader, &matrices)?;

            let mut total = 0;
            for pair_series in &series {
                let records = detector.detect(
                    &pair_series.samples,
                    Grouping::for_seasonal(matrices.seasonal),
                );
                total += records.len();
                println!(
                    "{}: {} samples, {} outliers",
                    pair_series.pair.label(),
                    pair_series.samples.len(),
                    records.len()
                );

                let path = pair_outlier_path(output_dir, &matrices, method, &pair_series.pair.key());
                CsvWriter::new().write_outliers(&records, matrices.seasonal, &path)?;
            }

            info!(
                instrument = %matrices.instrument,
                %method,
                outliers = total,
                "outlier detection finished"
            );
            println!("Found {} outliers across {} pairs", total, series.len());
        }

        Commands::Summary {
            matrices,
            output_file,
        } => {
            let output_file = output_file.unwrap_or_else(|| {
                filename::summary_filename(
                    &settings.output_dir,
                    &matrices.instrument,
                    matrices.variant,
                    matrices.seasonal,
                )
            });

            let reader = MatrixReader::new();
            let series = collect(&reader, &matrices)?;
            let analyzer = CorrelationAnalyzer::new();
            let summaries = analyzer.summarize(&series);

            println!("{}", analyzer.generate_summary(&summaries));
            CsvWriter::new().write_pair_summaries(&summaries, &output_file)?;
            println!("Summary written to {}", output_file.display());
        }

        Commands::Periods {
            input_file,
            output_file,
        } => {
            let output_file = output_file.unwrap_or_else(|| filename::periods_filename(&input_file));
            let records = read_outlier_records(&input_file)?;
            let periods = CorrelationAnalyzer::new().periods(&records)?;

            for period in &periods {
                println!(
                    "{} {}: {} to {} ({} days, r = {:.3})",
                    period.record.instrument_id,
                    period.record.year,
                    period.start,
                    period.end,
                    period.days(),
                    period.record.correlation_value
                );
            }

            CsvWriter::new().write_periods(&periods, &output_file)?;
            println!("Wrote {} periods to {}", periods.len(), output_file.display());
        }
    }

    Ok(())
}

/// Pipeline from settings, with command-line options taking precedence.
fn build_pipeline(options: &CorrelationArgs, settings: &Settings) -> CorrelationPipeline {
    CorrelationPipeline::new(options.resolution.unwrap_or(settings.resolution))
        .with_variants(options.variant.clone())
        .with_seasonal(options.seasonal)
        .with_degenerate_policy(options.degenerate_policy.unwrap_or(settings.degenerate_policy))
        .with_zero_rule(settings.zero_rule())
}

/// Fill an open end of the year span from the exports found on disk.
fn year_span(
    input_dir: &Path,
    instrument_id: &str,
    begin_year: Option<i32>,
    end_year: Option<i32>,
) -> Result<(i32, i32)> {
    let (begin_year, end_year) = match (begin_year, end_year) {
        (Some(begin), Some(end)) => (begin, end),
        (begin, end) => {
            let years = SourceScanner::new(input_dir).years_for(instrument_id)?;
            let (first, last) = match (years.first(), years.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => {
                    return Err(ProcessingError::MissingData(format!(
                        "no exports for {} in {}",
                        instrument_id,
                        input_dir.display()
                    )))
                }
            };
            (begin.unwrap_or(first), end.unwrap_or(last))
        }
    };
    check_year_span(begin_year, end_year)?;
    Ok((begin_year, end_year))
}

fn check_year_span(begin_year: i32, end_year: i32) -> Result<()> {
    if begin_year > end_year {
        return Err(ProcessingError::InvalidSetting(format!(
            "begin year {} is after end year {}",
            begin_year, end_year
        )));
    }
    Ok(())
}

fn collect(reader: &MatrixReader, matrices: &MatrixArgs) -> Result<Vec<PairSeries>> {
    let series = reader.collect_samples(
        &matrices.input_dir,
        &matrices.instrument,
        matrices.variant,
        matrices.seasonal,
    )?;

    let samples: usize = series.iter().map(|s| s.samples.len()).sum();
    if samples == 0 {
        return Err(ProcessingError::MissingData(format!(
            "no {} matrices of variant {} for {} in {}",
            if matrices.seasonal { "seasonal" } else { "yearly" },
            matrices.variant,
            matrices.instrument,
            matrices.input_dir.display()
        )));
    }
    Ok(series)
}

/// One outlier file per pair, named after the variant file with the pair key added.
fn pair_outlier_path(
    output_dir: &Path,
    matrices: &MatrixArgs,
    method: OutlierMethod,
    pair_key: &str,
) -> PathBuf {
    let base = filename::outlier_filename(
        output_dir,
        &matrices.instrument,
        matrices.variant,
        matrices.seasonal,
        method,
    );
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{}.{}", pair_key, name))
}
