use clap::{CommandFactory, Parser};
use filament::cli::{Cli, load_config, run_cli_with_config};
use filament::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let Some(command) = cli.mode() else {
        // No mode selected: show usage and exit cleanly
        if let Err(e) = Cli::command().print_help() {
            eprintln!("Error: {}", e);
        }
        println!();
        return ExitCode::SUCCESS;
    };

    OutputFormatter::header(&format!("filament v{}", env!("CARGO_PKG_VERSION")));

    match load_config(&cli).and_then(|config| run_cli_with_config(command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
