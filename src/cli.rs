//! CLI definitions for Promptwire.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Promptwire CLI.
#[derive(Parser)]
#[command(name = "promptwire")]
#[command(about = "Drive a browser-rendered chat UI over the Chrome DevTools Protocol")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// DevTools HTTP endpoint, overriding the configured one
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Report whether a matching chat tab is currently open
    Status,

    /// List open page targets and mark the ones matching the allow-list
    Targets,

    /// Send a prompt and print the captured response
    Send {
        /// The prompt text
        text: Option<String>,

        /// Pick one of the built-in sample prompts instead
        #[arg(long)]
        random: bool,

        /// Overall deadline in seconds (config default when omitted)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}
