//! CLI argument definitions (§4.15): a thin driver over `HostManager`,
//! exercising the same three consumer surfaces any embedder would —
//! `change_project`, the `register_*` cascade, and the `ExecutionFacade`
//! verbs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mcp-host")]
#[command(about = "Host runtime for a federation of MCP servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project file to load before running the command, overriding
    /// `project_path` in the settings file.
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single agent turn.
    Run {
        /// Name of the agent to run, as declared in the active project.
        agent: String,
        /// User message for this turn.
        message: String,
        /// Session id to load and append history under, if storage is enabled.
        #[arg(long)]
        session: Option<String>,
    },
    /// Run a simple (sequential) workflow.
    Workflow {
        /// Name of the workflow to run, as declared in the active project.
        workflow: String,
        /// Initial message fed to the first step.
        message: String,
    },
    /// List every tool currently reachable across connected clients.
    Tools,
    /// Project management.
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Load (or reload) a project file, reconnecting every configured client.
    Reload {
        /// Path to the project file.
        path: PathBuf,
    },
}

/// Mirrors the teacher's verbosity scheme: `-v` info, `-vv` debug, `-vvv+` trace.
/// `LOG_FORMAT=json` (or the settings file's `log_format`) switches to structured output.
pub fn init_tracing(verbosity: u8, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
