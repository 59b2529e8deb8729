mod audio;
mod cli;
mod commands;
mod common;
mod config;
mod error;
mod render;
mod style;
mod support;
mod timeline;
mod ui;

use clap::Parser;
use serde_json::json;

use crate::cli::Cli;
use crate::error::MvError;
use crate::ui::prelude::*;

fn main() {
    let cli = Cli::parse();

    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);
    if cli.debug {
        emit(Level::Debug, "mv.debug", "Debug mode is on", None);
    }

    if let Err(err) = commands::handle_command(cli.command) {
        report_error(&err);
        std::process::exit(1);
    }
}

fn report_error(err: &anyhow::Error) {
    let code = match err.downcast_ref::<MvError>() {
        Some(mv) => format!("mv.error.{}", mv.kind()),
        None => "mv.error".to_string(),
    };
    emit(
        Level::Error,
        &code,
        &format!("Error: {err:#}"),
        Some(json!({ "chain": err.chain().map(ToString::to_string).collect::<Vec<_>>() })),
    );
}
