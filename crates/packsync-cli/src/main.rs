use clap::Parser;
use packsync_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command.log_dir() {
        Some(dir) => {
            if logging::init_logging(&dir).is_err() {
                logging::init_logging_stderr(true);
            }
        }
        None => logging::init_logging_stderr(false),
    }

    if let Err(err) = cli.command.run().await {
        eprintln!("packsync error: {:#}", err);
        std::process::exit(1);
    }
}
