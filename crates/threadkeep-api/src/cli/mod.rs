//! CLI command definitions for the `threadkeep` binary.
//!
//! `serve` and `mcp` run the two transports; the rest are one-shot
//! operator commands against the configured store.

pub mod ask;
pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use threadkeep_types::chat::Namespace;

/// Session-scoped conversation memory in front of Gemini.
#[derive(Parser)]
#[command(name = "threadkeep", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config.toml (defaults to ~/.threadkeep/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Export spans through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP chat service.
    Serve {
        /// Port to listen on (overrides config and PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to.
        #[arg(long)]
        host: Option<String>,
    },

    /// Run the tool server on stdin/stdout.
    Mcp,

    /// Send one prompt, optionally continuing a session.
    Ask {
        /// Prompt text.
        text: String,

        /// Session to continue. Stateless when omitted.
        #[arg(short, long)]
        session: Option<String>,

        #[arg(long, default_value = "chat")]
        namespace: Namespace,
    },

    /// Show the stored transcript of a session.
    History {
        session: String,

        #[arg(long, default_value = "chat")]
        namespace: Namespace,
    },

    /// Delete a session's transcript.
    Forget {
        session: String,

        #[arg(long, default_value = "chat")]
        namespace: Namespace,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
