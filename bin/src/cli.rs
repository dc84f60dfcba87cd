use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use walletscan_utils::{
    disk_storage::{ProjectDir, DEFAULT_PROJECT},
    price_manager::CoinGecko,
    report::DEFAULT_REPORT_FILE,
    scan::{fetch_supported_coins, run_scan},
};

#[derive(Parser, Debug)]
#[clap(version, subcommand_required = true, arg_required_else_help = true)]
#[command(name = "walletscan", bin_name = "walletscan", version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch native and token balances of every wallet into a CSV report
    Scan {
        /// Directory holding wallets.txt, chainConfig.json and .properties
        #[arg(long, env = "WALLETSCAN_CONFIG_DIR")]
        config_dir: Option<PathBuf>,

        #[arg(short, long, default_value = DEFAULT_REPORT_FILE)]
        output: PathBuf,
    },

    /// Download the CoinGecko coin list used for coin names
    #[command(alias = "coins")]
    SupportedCoins {
        #[arg(long, env = "WALLETSCAN_CONFIG_DIR")]
        config_dir: Option<PathBuf>,
    },
}

fn project_dir(config_dir: Option<PathBuf>) -> walletscan_utils::Result<ProjectDir> {
    match config_dir {
        Some(root) => Ok(ProjectDir::with_root(root)),
        None => ProjectDir::new(DEFAULT_PROJECT),
    }
}

/// Text printed to stderr when a command fails.
pub fn error_report(err: &walletscan_utils::Error) -> String {
    let mut report = format!("{} {err}", style("error:").red());
    if err.is_connect() {
        report.push_str("\nPlease check your internet connection");
    }
    report
}

impl Commands {
    pub async fn handle(self) -> walletscan_utils::Result<()> {
        match self {
            Commands::Scan { config_dir, output } => {
                let dir = project_dir(config_dir)?;
                let summary = run_scan(&dir, &output).await?;

                println!(
                    "{} {} rows written to {}",
                    style("done:").green(),
                    summary.rows,
                    style(summary.output.display()).cyan()
                );
                if summary.failed > 0 {
                    println!(
                        "{} {} balances could not be fetched, see the log above",
                        style("warning:").yellow(),
                        summary.failed
                    );
                }
            }
            Commands::SupportedCoins { config_dir } => {
                let dir = project_dir(config_dir)?;
                let count = fetch_supported_coins(&dir, &CoinGecko::default()).await?;

                println!(
                    "{} {} coins saved to {}",
                    style("done:").green(),
                    count,
                    style(dir.root().display()).cyan()
                );
            }
        }
        Ok(())
    }
}
