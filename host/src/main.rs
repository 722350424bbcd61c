//! Host runtime entry point: a slim dispatcher that parses CLI args,
//! builds a `HostManager`, and routes each subcommand to its verb.

use anyhow::{Context, Result};
use clap::Parser;
use mcp_host::cli::{self, Cli, Commands, ProjectCommands};
use mcp_host::config::HostSettings;
use mcp_host::kernel::HostManager;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = HostSettings::load()?;
    if let Some(project) = &cli.project {
        settings.project_path = Some(project.clone());
    }

    let json_log = settings.log_format.eq_ignore_ascii_case("json");
    cli::init_tracing(cli.verbose, json_log);

    let components_root = dirs::config_dir()
        .map(|d| d.join("mcp-host").join("components"))
        .unwrap_or_else(|| std::path::PathBuf::from(".mcp-host/components"));
    let manager = HostManager::new(components_root, settings)?;

    let result = dispatch(cli.command, &manager).await;
    manager.shutdown().await;
    result
}

async fn dispatch(command: Commands, manager: &HostManager) -> Result<()> {
    match command {
        Commands::Run { agent, message, session } => {
            let facade = manager.facade().await.context("failed to start host runtime")?;
            let result = facade.run_agent(&agent, &message, None, session.as_deref()).await?;
            println!("{}", result.final_response);
        }
        Commands::Workflow { workflow, message } => {
            let facade = manager.facade().await.context("failed to start host runtime")?;
            let result = facade.run_simple_workflow(&workflow, &message).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Tools => {
            let facade = manager.facade().await.context("failed to start host runtime")?;
            for name in facade.tool_names() {
                println!("{name}");
            }
        }
        Commands::Project { command: ProjectCommands::Reload { path } } => {
            manager.change_project(&path).await?;
            println!("project reloaded from {}", path.display());
        }
    }
    Ok(())
}
