//! Scout CLI and REST API entry point.
//!
//! Binary name: `scout`
//!
//! Parses CLI arguments, initializes the database and workflow engine, then
//! either starts the REST API server or runs a job inspection command.

mod cli;
mod http;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, JobCommands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,scout=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { bind, database } => {
            let state = AppState::init(database).await?;
            serve(state, bind).await?;
        }

        Commands::Job { command } => {
            let state = AppState::init(None).await?;
            match command {
                JobCommands::Show { id } => {
                    cli::job::show_job(&state, &id, cli.json).await?;
                }
                JobCommands::List { limit } => {
                    cli::job::list_jobs(&state, limit, cli.json).await?;
                }
            }
        }
    }

    Ok(())
}

async fn serve(state: AppState, bind: Option<String>) -> anyhow::Result<()> {
    // Re-dispatch jobs a previous process left non-terminal. Without
    // server-side provider keys they are finalized as failed instead of
    // being silently dropped.
    let server_deps = state.server_plan_deps();
    let resumed = scout_core::pipeline::resume_incomplete(
        &state.engine,
        server_deps,
        state.selection_timeout(),
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    if resumed > 0 {
        tracing::info!(resumed, "re-dispatched interrupted jobs");
    }

    let addr = bind.unwrap_or_else(|| state.config.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "scout API listening");

    let router = http::router::build_router(state);
    axum::serve(listener, router).await?;
    Ok(())
}
