use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use droplink_peer::model::RoomId;
use droplink_peer::{
    FileOffer, HttpMailbox, NodeConfig, NodeHandle, PeerEvent, PeerNode, RtcTransportFactory,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "droplink")]
#[command(about = "Room-based peer discovery and direct file drop")]
struct Cli {
    /// Log filter directive, e.g. "info" or "droplink_peer=debug"
    #[arg(long, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mailbox server peers use to find each other
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
    /// Create a room and wait for peers
    Create {
        /// Mailbox server base URL, e.g. http://localhost:3000
        #[arg(long)]
        server: String,

        /// Display name announced to other peers
        #[arg(long)]
        name: Option<String>,

        /// File to send to every peer that connects
        #[arg(long)]
        file: Option<PathBuf>,

        /// Directory received files are written to
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Join an existing room
    Join {
        #[arg(long)]
        server: String,

        /// Room id printed by `droplink create`
        #[arg(long)]
        room: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid --log directive")?)
        .init();

    match cli.command {
        Commands::Serve { addr } => droplink_server::serve(addr).await,
        Commands::Create {
            server,
            name,
            file,
            out,
        } => run_peer(server, None, name, file, out).await,
        Commands::Join {
            server,
            room,
            name,
            file,
            out,
        } => run_peer(server, Some(room), name, file, out).await,
    }
}

async fn run_peer(
    server: String,
    room: Option<String>,
    name: Option<String>,
    file: Option<PathBuf>,
    out: PathBuf,
) -> Result<()> {
    let store = Arc::new(HttpMailbox::new(server.clone()));
    let factory = Arc::new(RtcTransportFactory::default());
    let config = NodeConfig {
        display_name: name,
        ..Default::default()
    };
    let (node, events) = PeerNode::start(store, factory, config);

    match room {
        None => {
            let id = node.create_room().await.context("failed to create room")?;
            println!("{} {id}", "room created:".green().bold());
            println!(
                "  peers join with: {}",
                format!("droplink join --server {server} --room {id}").cyan()
            );
        }
        Some(id) => {
            let id = RoomId::from_str(&id).context("invalid room id")?;
            node.join_room(id.clone())
                .await
                .context("failed to join room")?;
            println!("{} {id}", "joined room:".green().bold());
        }
    }

    let offer = match &file {
        Some(path) => Some(
            FileOffer::from_path(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };

    event_loop(node, events, offer, &out).await
}

async fn event_loop(
    node: NodeHandle,
    mut events: mpsc::UnboundedReceiver<PeerEvent>,
    offer: Option<FileOffer>,
    out: &Path,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "leaving room".yellow());
                node.disconnect().await;
                return Ok(());
            }

            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(());
                };
                handle_event(&node, event, offer.as_ref(), out).await?;
            }
        }
    }
}

async fn handle_event(
    node: &NodeHandle,
    event: PeerEvent,
    offer: Option<&FileOffer>,
    out: &Path,
) -> Result<()> {
    match event {
        PeerEvent::PeerConnected { peer, name } => {
            let label = name.unwrap_or_else(|| peer.to_string());
            println!("{} {label}", "peer connected:".green());

            if let Some(offer) = offer {
                match node.send_file(peer, offer.clone()).await {
                    Ok(id) => println!("  sending {} (transfer {id})", offer.name.cyan()),
                    Err(e) => eprintln!("  {} {e}", "send failed:".red()),
                }
            }
        }

        PeerEvent::PeerDisconnected { peer } => {
            println!("{} {peer}", "peer disconnected:".yellow());
        }

        PeerEvent::NegotiationFailed { peer, reason } => {
            eprintln!("{} {peer}: {reason}", "negotiation failed:".red());
        }

        PeerEvent::IncomingFile { transfer } => {
            println!(
                "{} {} ({} bytes)",
                "incoming:".cyan(),
                transfer.name,
                transfer.size
            );
        }

        PeerEvent::TransferProgress { id, percent, .. } => {
            print!("\r  transfer {id}: {percent:>5.1}%");
        }

        PeerEvent::TransferCompleted { id } => {
            println!("\r  transfer {id}: {}", "done".green());
        }

        PeerEvent::TransferFailed { id, reason } => {
            eprintln!("\r  transfer {id}: {} {reason}", "failed:".red());
        }

        PeerEvent::FileReceived { name, bytes, .. } => {
            let path = out.join(&name);
            if path.exists() {
                let overwrite = dialoguer::Confirm::new()
                    .with_prompt(format!("{} exists, overwrite?", path.display()))
                    .default(false)
                    .interact()?;
                if !overwrite {
                    println!("{} {name}", "skipped".yellow());
                    return Ok(());
                }
            }
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} ({} bytes)",
                "received:".green().bold(),
                path.display(),
                bytes.len()
            );
        }
    }

    Ok(())
}
