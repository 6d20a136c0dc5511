//! threadkeep entry point.
//!
//! Binary name: `threadkeep`
//!
//! Parses CLI arguments, loads configuration, opens the transcript store and
//! dispatches to the HTTP service, the stdio tool server or a one-shot
//! command.

mod cli;
mod http;
mod mcp;
mod state;
mod sweeper;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Commands};
use state::AppState;
use threadkeep_infra::config::load_config;
use threadkeep_observe::tracing_setup::{init_tracing, shutdown_tracing, TracingOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "threadkeep", &mut std::io::stdout());
        return Ok(());
    }

    let mut tracing_options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    tracing_options.json = cli.json;
    // The OTel stdout exporter would corrupt the JSON-RPC stream.
    tracing_options.otel = cli.otel && !matches!(cli.command, Commands::Mcp);
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let mut config = load_config(cli.config.as_deref()).await?;
    if let Commands::Serve { port, host } = &cli.command {
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(host) = host {
            config.server.host = host.clone();
        }
    }

    let state = AppState::init(config).await?;
    let result = run(cli, state.clone()).await;

    state.close().await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, state: AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { .. } => serve(state).await?,

        Commands::Mcp => {
            let server = mcp::McpServer::new(
                state.chat_service.clone(),
                state.config.chat.default_workspace.clone(),
            );
            tracing::info!("Tool server ready on stdio");
            server
                .serve(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
        }

        Commands::Ask {
            text,
            session,
            namespace,
        } => {
            cli::ask::ask(&state, &text, session.as_deref(), namespace, cli.json).await?;
        }

        Commands::History { session, namespace } => {
            cli::session::show_history(&state, &session, namespace, cli.json).await?;
        }

        Commands::Forget { session, namespace } => {
            cli::session::forget(&state, &session, namespace, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let cancel = CancellationToken::new();
    let sweeper = sweeper::spawn_sweeper(
        state.chat_service.store().clone(),
        state.config.storage.sweep_interval(),
        cancel.clone(),
    );

    tracing::info!(
        %addr,
        storage = ?state.config.storage.backend,
        provider = state.chat_service.provider_name(),
        "threadkeep listening"
    );
    eprintln!(
        "  {} threadkeep listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    eprintln!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Expiry sweeper task failed");
    }

    eprintln!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
