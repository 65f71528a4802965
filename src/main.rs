mod cli;
mod commands;
mod common;
mod config;
mod pipeline;
mod project;
mod services;
mod timeline;
mod ui;

use clap::Parser;

use crate::cli::Cli;
use crate::ui::prelude::{Level, OutputFormat, emit};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.no_color);

    if let Err(err) = commands::dispatch(cli.command).await {
        emit(
            Level::Error,
            "cli.error",
            &format!("Error: {:#}", err),
            None,
        );
        std::process::exit(1);
    }
}
