//! CLI argument definitions for the readmission risk service.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "readmit",
    version,
    about = "30-day readmission risk - train, serve and query the prediction model",
    long_about = "Train and serve a 30-day hospital readmission risk model.\n\n\
                  Training data comes from a local patient store when one is configured\n\
                  and from a deterministic synthetic cohort otherwise."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Service configuration file (TOML).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Model bundle path (overrides `[model] bundle_path`).
    #[arg(long = "bundle", value_name = "PATH", global = true)]
    pub bundle: Option<PathBuf>,

    /// Local patient store directory (overrides `[data] store`).
    #[arg(long = "store", value_name = "DIR", global = true)]
    pub store: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient field values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Train a new model and persist it.
    Train(TrainArgs),

    /// Score one patient given as a JSON object.
    Predict(PredictArgs),

    /// Describe the current model.
    Info,

    /// Report model and data-source health as JSON.
    Health,

    /// Summarise the training cohort.
    Stats,

    /// Upload a CSV file of patient records into the local store.
    Upload(UploadArgs),

    /// Serve JSON requests line by line on stdin/stdout.
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct TrainArgs {
    /// Ignore the patient store and train on synthetic data only.
    #[arg(long = "synthetic")]
    pub synthetic: bool,
}

#[derive(Args)]
pub struct PredictArgs {
    /// Patient fields as a JSON object, e.g. '{"age": 72, "diagnosis": "COPD"}'.
    #[arg(value_name = "JSON", required_unless_present = "file")]
    pub payload: Option<String>,

    /// Read the JSON object from a file instead.
    #[arg(long = "file", value_name = "PATH", conflicts_with = "payload")]
    pub file: Option<PathBuf>,
}

#[derive(Args)]
pub struct UploadArgs {
    /// CSV file with one patient per row.
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Identifier of the receiving hospital.
    #[arg(long = "hospital-id")]
    pub hospital_id: String,

    /// Display name of the hospital (defaults to the identifier).
    #[arg(long = "hospital-name")]
    pub hospital_name: Option<String>,

    #[arg(long = "location", default_value = "")]
    pub location: String,

    /// Documents per batch write (at most 500).
    #[arg(long = "batch-size", default_value_t = 100)]
    pub batch_size: usize,

    /// Attempts per batch before it is reported as failed.
    #[arg(long = "max-attempts", default_value_t = 3)]
    pub max_attempts: u32,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Do not start the background retraining scheduler.
    #[arg(long = "no-scheduler")]
    pub no_scheduler: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
