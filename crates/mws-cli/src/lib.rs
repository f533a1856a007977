//! Command line front end: loads a directory of content XML into an engine
//! and runs one command against it.

use std::ffi::OsString;

use clap::Parser;
use mws_core::ScriptError;

mod cli_args;
mod commands;
mod error_map;
mod logging;
mod models;
mod report;
mod source_loader;
mod state_store;

pub(crate) use cli_args::{
    Cli, Command, DialogueArgs, DumpArgs, EvalArgs, GlobalArgs, RunArgs,
};
pub(crate) use error_map::{
    emit_error, map_cli_output, map_cli_source_path, map_cli_source_read, map_cli_source_scan,
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write,
};
pub(crate) use models::{CommandReport, RunState, RUN_STATE_SCHEMA};
pub(crate) use report::emit_report;
#[cfg(test)]
pub(crate) use report::render_lines;
pub(crate) use source_loader::load_content_dir;
#[cfg(test)]
pub(crate) use source_loader::{read_content_xml_from_dir, resolve_content_dir};
pub(crate) use state_store::{load_run_state, save_run_state};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    logging::init_tracing();
    let json = cli.global.json;
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error, json),
    }
}

fn run(cli: Cli) -> Result<i32, ScriptError> {
    let Cli { global, command } = cli;
    let report = match command {
        Command::Compile => commands::run_compile(&global)?,
        Command::Dump(args) => commands::run_dump(&global, args)?,
        Command::Run(args) => commands::run_ticks(&global, args)?,
        Command::Eval(args) => commands::run_eval(&global, args)?,
        Command::Dialogue(args) => commands::run_dialogue(&global, args)?,
    };
    emit_report(&report, global.json)?;
    Ok(report.exit_code())
}
