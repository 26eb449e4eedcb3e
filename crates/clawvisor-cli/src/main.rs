//! CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use clawvisor_cli::config::load_settings;
use clawvisor_cli::handlers::run::RunArgs;
use clawvisor_cli::{Cli, CliError, Commands, bootstrap, handlers, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(mut cli: Cli) -> anyhow::Result<()> {
    match cli.command.take().unwrap_or_default() {
        Commands::Run { json } => {
            let ctx = bootstrap(&cli)?;
            handlers::run::execute(&ctx, RunArgs { json }).await
        }
        Commands::Status { json } => {
            let ctx = bootstrap(&cli)?;
            handlers::status::execute(&ctx, json).await
        }
        Commands::Detect { json } => {
            let settings = load_settings(&cli)?;
            handlers::detect::execute(settings.cli.as_deref(), json).await
        }
    }
}
