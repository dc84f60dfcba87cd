use std::process::ExitCode;

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    walletscan_utils::log::init(cli.verbose);

    match cli.cmd.handle().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", cli::error_report(&err));
            ExitCode::FAILURE
        }
    }
}
