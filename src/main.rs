use clap::Parser;
use pollcast::cli::{self, Cli, Command};
use pollcast::config::Config;
use pollcast::{logging, polls, server};
use std::process::ExitCode;
use std::time::Duration;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match &cli.command {
        None | Some(Command::Start) => match cli.load_config() {
            Ok(config) => run_server(config).await,
            Err(e) => Err(e.into()),
        },
        Some(Command::Status(args)) => {
            let display_port = cli
                .load_config()
                .map(|cfg| cfg.display.bind.port())
                .unwrap_or(5000);
            cli::run_status(args, display_port).await.map_err(Into::into)
        }
        Some(Command::Config { action }) => {
            cli::run_config(action, &cli.config_path()).map_err(Into::into)
        }
        Some(Command::Version) => {
            cli::print_version();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.logging)?;

    tracing::info!(
        display = %config.display.bind,
        dashboard = %config.dashboard.bind,
        voting = %config.voting.bind,
        cooldown_secs = config.voting.cooldown_secs,
        "starting pollcast"
    );

    let engine = polls::create_engine(Duration::from_secs(config.voting.cooldown_secs));
    server::serve(&config, engine).await?;
    Ok(())
}
