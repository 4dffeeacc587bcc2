//! respack CLI entry point (spec §6.1).

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use respack_cli::build_config;
use respack_cli::cli_args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Dump { config }) = &cli.command {
        eprintln!(
            "{} dump is out of scope for this build (requested: {})",
            "error:".red().bold(),
            config.as_deref().unwrap_or("<none>")
        );
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = build_config(cli)?;
    println!(
        "{} {} module(s) -> {}",
        "Packaging:".cyan().bold(),
        config.inputs.len(),
        config.output_path.display()
    );

    let report = respack_pipeline::run(&config)?;

    println!(
        "{} {} resource(s), {} diagnostic(s)",
        "Done:".green().bold(),
        report.item_count,
        report.diagnostics.len()
    );
    for diag in &report.diagnostics {
        print!("{diag}");
    }
    Ok(())
}
