mod cli;
mod simulate;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SummaryFormat};
use crate::simulate::{run_simulate, Summary};

fn print_summary(summary: &Summary, format: SummaryFormat) -> Result<()> {
    match format {
        SummaryFormat::Text => {
            println!(
                "{} bytes in {} chunks, {:.2}s ({:.2}s paused){}",
                summary.total_bytes,
                summary.chunks,
                summary.elapsed_secs,
                summary.paused_secs,
                if summary.completed { "" } else { ", interrupted" },
            );
        }
        SummaryFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let result: Result<()> = match cli.command {
        Some(Commands::Simulate(sim)) => {
            let format = sim.summary;
            run_simulate(sim).and_then(|summary| print_summary(&summary, format))
        }
        Some(Commands::Render { value, unit, format }) => speedbar::SpeedFormat::parse(&format)
            .map(|f| println!("{}", f.render(value, unit.into())))
            .map_err(anyhow::Error::from),
        None => {
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(err) = result {
        let code = exit_code_for_error(&err);
        eprintln!("error: {err:?}");
        std::process::exit(code);
    }
}

pub(crate) fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    // 2: bad format string, 3: terminal/output failure, 1: other
    for cause in err.chain() {
        if cause.is::<speedbar::FormatError>() {
            return 2;
        }
        if cause.is::<std::io::Error>() {
            return 3;
        }
    }
    1
}
