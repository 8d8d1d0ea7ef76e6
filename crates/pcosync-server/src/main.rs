use std::process::ExitCode;

use clap::Parser;
use pcosync_core::{AppConfig, TracingConfig, init_tracing};
use pcosync_server::ServerResult;
use pcosync_server::cli::{AuthAction, Cli, Command};
use pcosync_server::commands;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(tracing_config(&cli)) {
        eprintln!("error: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn tracing_config(cli: &Cli) -> TracingConfig {
    let serving = matches!(cli.command, None | Some(Command::Serve { .. }));
    TracingConfig::for_command(serving, cli.debug, cli.log_format)
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = AppConfig::from_env()?;

    match cli.command {
        None => commands::serve::run(config, None, false).await,
        Some(Command::Serve { port, strict }) => commands::serve::run(config, port, strict).await,
        Some(Command::Auth { action }) => match action {
            AuthAction::Url => commands::auth::url(&config),
            AuthAction::Exchange { code } => commands::auth::exchange(&config, &code).await,
        },
    }
}
