#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use permgate::catalog::StaticCatalog;
use permgate::commands::{PermCommand, WebUiAction, handle_command, parse_command};
use permgate::config::Config;
use permgate::registry::PermissionRegistry;
use permgate::store::PermissionStore;
use permgate::webui::WebUiServer;

#[derive(Parser)]
#[command(name = "permgate", about = "Permission registry for chat-bot plugin commands")]
struct Cli {
    /// Config file (default: ~/.permgate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the admin web UI until interrupted
    Serve,
    /// Execute a single `perm` chat command and print the reply
    Exec {
        /// The command line, e.g. `perm set astrbot ping admin`
        line: Vec<String>,
    },
}

/// `exec` is one-shot: a web UI started here would die with the process,
/// so the reply must not promise a running server.
fn one_shot_rejection(command: &PermCommand) -> Option<&'static str> {
    match command {
        PermCommand::WebUi {
            action: WebUiAction::Start,
        } => Some("the admin web UI cannot outlive a one-shot exec; run `permgate serve` instead"),
        PermCommand::WebUi {
            action: WebUiAction::Stop,
        } => Some("no admin web UI runs inside a one-shot exec; stop the `permgate serve` process instead"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let mut config = match cli.config {
        Some(path) => Config::load_or_init_at(path)?,
        None => Config::load_or_init()?,
    };
    config.apply_env_overrides();
    config.validate()?;

    // A corrupt store aborts startup rather than silently answering with
    // defaults over broken data.
    let store = Arc::new(PermissionStore::open(config.store_path.clone())?);
    let catalog_path = config
        .catalog_path
        .as_deref()
        .context("no catalog_path configured; point it at a plugin catalog TOML")?;
    let catalog = Arc::new(StaticCatalog::load(catalog_path)?);
    let registry = Arc::new(PermissionRegistry::new(catalog, store));

    match cli.command {
        Command::Serve => {
            if !config.webui.enabled {
                bail!("webui.enabled is false; enable it in the config to serve");
            }
            let webui = WebUiServer::new(
                &config.webui,
                registry,
                config.log_permission_changes,
            );
            webui.start().await?;
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for shutdown signal")?;
            tracing::info!("shutting down");
            webui.stop().await;
        }
        Command::Exec { line } => {
            if !config.command_enabled {
                bail!("command_enabled is false; chat commands are disabled");
            }
            let line = line.join(" ");
            let webui = WebUiServer::new(
                &config.webui,
                registry.clone(),
                config.log_permission_changes,
            );
            match parse_command(&line) {
                Some(command) => {
                    if let Some(reason) = one_shot_rejection(&command) {
                        bail!(reason);
                    }
                    println!("{}", handle_command(command, &registry, &webui).await);
                }
                None => bail!("not a perm command: {line}"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_rejects_webui_lifecycle_commands() {
        let start = parse_command("perm webui start").unwrap();
        assert!(one_shot_rejection(&start).unwrap().contains("serve"));

        let stop = parse_command("perm webui stop").unwrap();
        assert!(one_shot_rejection(&stop).is_some());
    }

    #[test]
    fn exec_still_answers_webui_status_and_registry_commands() {
        let status = parse_command("perm webui status").unwrap();
        assert!(one_shot_rejection(&status).is_none());

        let list = parse_command("perm list").unwrap();
        assert!(one_shot_rejection(&list).is_none());
    }
}
