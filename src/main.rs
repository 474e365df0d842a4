use clap::Parser;
use photo_sorter_lib::cli::{Cli, Command};
use photo_sorter_lib::commands::{self, RunStatus};
use photo_sorter_lib::logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Usage errors exit with code 2 from here.
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("{:#}", e);
        return RunStatus::Failed.into();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return RunStatus::Failed.into();
        }
    };

    let status = runtime.block_on(async {
        match cli.command {
            Command::Watch(args) => commands::watch::run(args).await,
            Command::Classify(args) => commands::classify::run(args).await,
        }
    });

    status.into()
}
