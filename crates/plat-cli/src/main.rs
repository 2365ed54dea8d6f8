//! Plat survey geometry CLI.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{ColorChoice, Parser};
use plat_cli::logging::{LogConfig, LogFormat, init_logging};
use plat_store::{GeometryStore, LocalSessions};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod render;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    run_add_point, run_add_segment, run_clear, run_delete, run_import, run_recalculate, run_show,
    run_undo, run_update_point, run_update_segment,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let store = GeometryStore::new(LocalSessions::new(resolve_data_dir(cli.data_dir)));
    let result = match cli.command {
        Command::Show(args) => run_show(&store, &args),
        Command::AddPoint(args) => run_add_point(&store, args),
        Command::UpdatePoint(args) => run_update_point(&store, args),
        Command::AddSegment(args) => run_add_segment(&store, args),
        Command::UpdateSegment(args) => run_update_segment(&store, args),
        Command::Recalculate(args) => run_recalculate(&store, args),
        Command::Delete(args) => run_delete(&store, args),
        Command::Import(args) => run_import(&store, args),
        Command::Undo(args) => run_undo(&store, &args),
        Command::Clear(args) => run_clear(&store, &args),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Flag wins over the `PLAT_DATA_DIR` environment variable, which wins over
/// the `./plat-data` default.
fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("PLAT_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("plat-data"))
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
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
