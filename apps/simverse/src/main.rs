use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{FleetClient, FleetUpdate, Intent, LogEntry};
use shared::domain::AgentId;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "simverse", about = "Watch and steer the Echo fleet")]
struct Args {
    /// Orchestrator WebSocket endpoint, e.g. ws://localhost:8502/ws
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fleet scene on every snapshot.
    Watch {
        /// Highlight this agent.
        #[arg(long)]
        select: Option<String>,
        /// Exit after this many snapshots.
        #[arg(long)]
        snapshots: Option<usize>,
    },
    Start {
        id: String,
    },
    Stop {
        id: String,
    },
    Restart {
        id: String,
    },
    Retire {
        id: String,
    },
    Logs {
        id: String,
    },
    Create {
        name: String,
        #[arg(long)]
        image: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;
    if let Some(endpoint) = args.endpoint {
        settings.endpoint = endpoint;
    }
    settings.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut client = FleetClient::connect(&settings.endpoint)
        .await
        .with_context(|| format!("failed to reach orchestrator at {}", settings.endpoint))?
        .with_default_image(settings.default_image.clone());
    info!(endpoint = %settings.endpoint, "connected");

    let timeout = settings.response_timeout();
    let outcome = match args.command {
        Command::Watch { select, snapshots } => watch(&mut client, select, snapshots).await,
        Command::Start { id } => {
            run_command(&mut client, Intent::Start(id.into()), timeout).await
        }
        Command::Stop { id } => {
            run_command(&mut client, Intent::Stop(id.into()), timeout).await
        }
        Command::Restart { id } => {
            run_command(&mut client, Intent::Restart(id.into()), timeout).await
        }
        Command::Retire { id } => {
            run_command(&mut client, Intent::Retire(id.into()), timeout).await
        }
        Command::Logs { id } => fetch_logs(&mut client, id.into(), timeout).await,
        Command::Create { name, image } => {
            run_command(
                &mut client,
                Intent::CreateAgent { name, image },
                timeout,
            )
            .await
        }
    };

    client.close().await;
    outcome
}

async fn watch(
    client: &mut FleetClient,
    select: Option<String>,
    snapshots: Option<usize>,
) -> Result<()> {
    let mut seen = 0usize;
    let mut pending_select = select.map(AgentId::from);
    while let Some(update) = client.next_update().await {
        match update {
            FleetUpdate::AgentsReconciled(_) => {
                if let Some(id) = pending_select.take() {
                    client.select(&id);
                }
                println!("{}", render::render_scene(&client.state().scene()));
                seen += 1;
                if snapshots.is_some_and(|limit| seen >= limit) {
                    return Ok(());
                }
            }
            FleetUpdate::Connection(state) if state.is_terminal() => {
                bail!("orchestrator connection ended: {state}");
            }
            _ => {}
        }
    }
    Ok(())
}

async fn run_command(client: &mut FleetClient, intent: Intent, timeout: Duration) -> Result<()> {
    let command = client.dispatch(intent).await?;
    let action = command.action();

    let reply = tokio::time::timeout(timeout, async {
        while let Some(update) = client.next_update().await {
            match update {
                FleetUpdate::CommandReceipt { success, message } => {
                    return Ok((success.unwrap_or(true), message.unwrap_or_default()));
                }
                FleetUpdate::BackendError(error) => return Ok((false, error.message)),
                FleetUpdate::Connection(state) if state.is_terminal() => {
                    return Err(anyhow!("connection ended before a receipt: {state}"));
                }
                _ => {}
            }
        }
        Err(anyhow!("connection ended before a receipt"))
    })
    .await
    .with_context(|| format!("no receipt for {action} within {}s", timeout.as_secs()))??;

    match reply {
        (true, message) => {
            println!("{action}: {message}");
            Ok(())
        }
        (false, message) => bail!("{action} failed: {message}"),
    }
}

async fn fetch_logs(client: &mut FleetClient, id: AgentId, timeout: Duration) -> Result<()> {
    client.dispatch(Intent::FetchLogs(id.clone())).await?;

    tokio::time::timeout(timeout, async {
        while let Some(update) = client.next_update().await {
            match update {
                FleetUpdate::LogsUpdated { agent_id } if agent_id == id => return Ok(()),
                FleetUpdate::BackendError(error) => bail!("get_logs failed: {}", error.message),
                _ => {}
            }
        }
        Err(anyhow!("connection ended before logs arrived"))
    })
    .await
    .with_context(|| format!("no logs for {} within {}s", id.short(), timeout.as_secs()))??;

    let state = client.state();
    let received_at = state.log_entry(&id).map(LogEntry::received_at);
    println!("{}", render::render_logs(state.logs(&id), received_at));
    Ok(())
}
