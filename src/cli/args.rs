use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{Resolution, Variant};
use crate::processors::{DegeneratePolicy, OutlierMethod};

#[derive(Parser)]
#[command(name = "sgpmet-processor")]
#[command(about = "Correlation and outlier analysis of ARM sgpmet surface meteorology data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase log verbosity (-v info, -vv debug, -vvv trace)"
    )]
    pub verbose: u8,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Settings file [default: sgpmet.toml if present]")]
    pub config: Option<PathBuf>,
}

/// Options shared by the commands that compute correlation matrices.
#[derive(Args, Debug, Clone)]
pub struct CorrelationArgs {
    #[arg(short, long, help = "Directory of sgpmet observation exports")]
    pub input_dir: PathBuf,

    #[arg(long, help = "Instrument id, e.g. E11")]
    pub instrument: String,

    #[arg(long, help = "Also compute one matrix per season")]
    pub seasonal: bool,

    #[arg(
        long,
        value_enum,
        num_args = 1..,
        help = "Variants to compute [default: all]"
    )]
    pub variant: Vec<Variant>,

    #[arg(long, value_enum, help = "Grid resolution [default: minute]")]
    pub resolution: Option<Resolution>,

    #[arg(short, long, help = "Directory for matrix files [default: output]")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, value_enum, help = "Handling of degenerate series [default: abort]")]
    pub degenerate_policy: Option<DegeneratePolicy>,
}

/// Options shared by the commands that read stored matrices.
#[derive(Args, Debug, Clone)]
pub struct MatrixArgs {
    #[arg(short, long, help = "Directory of correlation matrix files")]
    pub input_dir: PathBuf,

    #[arg(long, help = "Instrument id, e.g. E11")]
    pub instrument: String,

    #[arg(long, value_enum, default_value = "no-precip")]
    pub variant: Variant,

    #[arg(long, help = "Use the seasonal matrices instead of the yearly ones")]
    pub seasonal: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the correlation matrices of one instrument and year
    Correlate {
        #[command(flatten)]
        options: CorrelationArgs,

        #[arg(long)]
        year: i32,
    },

    /// Compute correlation matrices for a span of years in parallel
    ProcessDirectory {
        #[command(flatten)]
        options: CorrelationArgs,

        #[arg(long, help = "First year [default: earliest year with exports]")]
        begin_year: Option<i32>,

        #[arg(long, help = "Last year [default: latest year with exports]")]
        end_year: Option<i32>,

        #[arg(long, help = "Worker threads [default: CPU count]")]
        max_workers: Option<usize>,

        #[arg(
            long,
            help = "Batch report JSON path [default: sgpmet-report-{instrument}-{YYMMDD}.json]"
        )]
        report: Option<PathBuf>,
    },

    /// Export per-day values of every variable for a span of years
    Daily {
        #[arg(short, long, help = "Directory of sgpmet observation exports")]
        input_dir: PathBuf,

        #[arg(long)]
        instrument: String,

        #[arg(long)]
        begin_year: i32,

        #[arg(long)]
        end_year: i32,

        #[arg(
            short,
            long,
            help = "Output CSV path [default: {output_dir}/{instrument}.daily.{begin}-{end}.csv]"
        )]
        output_file: Option<PathBuf>,
    },

    /// Detect outliers in stored correlation matrices
    Outliers {
        #[command(flatten)]
        matrices: MatrixArgs,

        #[arg(long, value_enum, default_value = "iqr")]
        method: OutlierMethod,

        #[arg(short, long, help = "Directory for outlier files [default: output]")]
        output_dir: Option<PathBuf>,
    },

    /// Summarize the distribution of every variable pair
    Summary {
        #[command(flatten)]
        matrices: MatrixArgs,

        #[arg(
            short,
            long,
            help = "Output CSV path [default: {output_dir}/{instrument}.{variant}.{shape}.summary.csv]"
        )]
        output_file: Option<PathBuf>,
    },

    /// Derive the date window of every outlier record
    Periods {
        #[arg(short, long, help = "Outlier record file")]
        input_file: PathBuf,

        #[arg(short, long, help = "Output CSV path [default: {input}.periods.csv]")]
        output_file: Option<PathBuf>,
    },
}
