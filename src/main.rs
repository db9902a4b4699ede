use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use mailforge::cli::{Cli, Command};
use mailforge::command::{attach, compose, dkim, send};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", format!("Error: {err:#}").red());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Compose(args) => compose::run(args)?,
        Command::Attach(args) => attach::run(args)?,
        Command::Dkim(args) => dkim::run(args)?,
        Command::Send(args) => send::run(args)?,
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}
