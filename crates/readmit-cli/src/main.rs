//! Readmission risk CLI.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use readmit_cli::logging::{LogConfig, LogFormat, init_logging};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, ServeArgs};
use crate::commands::{
    load_config, run_health, run_info, run_predict, run_serve, run_stats, run_train, run_upload,
};
use crate::summary::{
    print_data_stats, print_model_info, print_response, print_training_summary,
    print_upload_report,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<i32> {
    let config = load_config(cli)?;
    match &cli.command {
        Command::Train(args) => {
            let outcome = run_train(&config, args)?;
            print_training_summary(&outcome);
            Ok(0)
        }
        Command::Predict(args) => {
            let response = run_predict(&config, args)?;
            print_response(&response);
            Ok(if response.is_success() { 0 } else { 1 })
        }
        Command::Info => {
            let manager = run_info(&config)?;
            match manager.current()? {
                Some(bundle) => {
                    print_model_info(&bundle, &config.schedule);
                    Ok(0)
                }
                None => {
                    eprintln!("error: no model available");
                    Ok(1)
                }
            }
        }
        Command::Health => {
            let response = run_health(&config)?;
            print_response(&response);
            Ok(0)
        }
        Command::Stats => {
            let (stats, source) = run_stats(&config)?;
            print_data_stats(&stats, source);
            Ok(0)
        }
        Command::Upload(args) => {
            let report = run_upload(&config, args)?;
            print_upload_report(&report);
            Ok(if report.failed == 0 { 0 } else { 1 })
        }
        Command::Serve(args) => serve(config, args),
    }
}

fn serve(config: readmit_core::ServiceConfig, args: &ServeArgs) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(run_serve(config, args))?;
    Ok(0)
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
