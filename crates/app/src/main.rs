use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod render;

#[derive(Parser)]
#[command(
    name = "reckon",
    version,
    about = "Reconcile a savings workbook against its hand-kept truth ledger"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare computed monthly totals against the Detail ledger
    Compare {
        /// Workbook to process
        #[arg(long, default_value = "./data/Savings.xlsx")]
        file: PathBuf,
        #[arg(long, default_value_t = 2024)]
        year: i32,
        /// Directory holding categories.toml and suppress.toml
        #[arg(long, default_value = "./config")]
        config_dir: PathBuf,
        /// Restrict truth expenses to the card category whitelist
        #[arg(long)]
        cards_only: bool,
    },
    /// Match Amazon card charges against itemized order rows
    Amazon {
        #[arg(long, default_value = "./data/Savings.xlsx")]
        file: PathBuf,
        #[arg(long, default_value_t = 2024)]
        year: i32,
        #[arg(long, default_value = "./config")]
        config_dir: PathBuf,
        /// Also attempt split-shipment group matching
        #[arg(long)]
        grouped: bool,
        /// Emit a machine-readable JSON summary instead of tables
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compare {
            file,
            year,
            config_dir,
            cards_only,
        } => commands::compare(&file, year, &config_dir, cards_only),
        Command::Amazon {
            file,
            year,
            config_dir,
            grouped,
            json,
        } => commands::amazon(&file, year, &config_dir, grouped, json),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
