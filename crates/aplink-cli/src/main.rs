use std::path::PathBuf;

use anyhow::{Context, Result};
use aplink_core::consts::device::{DISCOVERY_INTERVAL, REDISCOVERY_DELAY};
use aplink_core::snes::queue;
use aplink_core::{
    CacheStore, Config, ConsoleCommand, DeviceSession, QueueHandle, Session, SessionEnd, WsWire,
    discover,
};
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aplink")]
#[command(about = "Archipelago multiworld bridge for SNES devices")]
struct Args {
    /// Multiworld server address (host or host:port)
    #[arg(short, long)]
    server: Option<String>,

    /// Device identity to attach to; defaults to the first one discovered
    #[arg(short, long)]
    device: Option<String>,

    /// Device daemon WebSocket endpoint
    #[arg(long)]
    daemon: Option<String>,

    /// Room password
    #[arg(long)]
    password: Option<String>,

    #[arg(short, long, default_value = "aplink.toml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("aplink=info".parse()?))
        .init();

    let args = Args::parse();

    info!("aplink {}", env!("CARGO_PKG_VERSION"));

    // Load config, then apply CLI overrides
    let mut config = match Config::load(&args.config) {
        Ok(config) => {
            info!("Loaded config from {:?}", args.config);
            config
        }
        Err(err) => {
            debug!("No config file loaded ({}), using defaults", err);
            Config::default()
        }
    };
    if let Some(server) = args.server {
        config.server = Some(server);
    }
    if let Some(device) = args.device {
        config.device = Some(device);
    }
    if let Some(daemon) = args.daemon {
        config.daemon = daemon;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }

    let server_address = config
        .server
        .clone()
        .context("no server address; pass --server or set `server` in the config file")?;

    let store = CacheStore::open_default().context("could not open the cache directory")?;

    // Console input: plain lines are chat, /sync requests a resend
    let (console_tx, mut console_rx) = mpsc::unbounded_channel();
    tokio::spawn(console_loop(console_tx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
        result = run_bridge(&config, &store, &server_address, &mut console_rx) => result,
    }
}

/// Outer lifecycle: reach the daemon, attach a device, run a session, and
/// start over after device faults. Ends only on a terminal session failure.
async fn run_bridge(
    config: &Config,
    store: &CacheStore,
    server_address: &str,
    console: &mut mpsc::UnboundedReceiver<ConsoleCommand>,
) -> Result<()> {
    loop {
        let wire = match WsWire::connect(&config.daemon).await {
            Ok(wire) => wire,
            Err(err) => {
                warn!("Device daemon unreachable at {}: {}", config.daemon, err);
                sleep(DISCOVERY_INTERVAL).await;
                continue;
            }
        };

        // Fresh queue per attach; nothing is shared across sessions.
        let (queue, requests) = queue::channel();
        let queue_task = tokio::spawn(queue::run(Box::new(wire), requests));

        let device = match attach_device(&queue, config).await {
            Ok(device) => device,
            Err(err) => {
                warn!("Device attach failed: {}", err);
                drop(queue);
                let _ = queue_task.await;
                sleep(REDISCOVERY_DELAY).await;
                continue;
            }
        };

        let session = Session::new(&device, store, config, server_address);
        match session.run(console).await {
            SessionEnd::DeviceFault(err) => {
                error!(
                    "Problem communicating with the SNES device: {}. Ensure it is powered on \
                     and the ROM is loaded; rediscovering shortly.",
                    err
                );
                drop(device);
                drop(queue);
                let _ = queue_task.await;
                sleep(REDISCOVERY_DELAY).await;
            }
            SessionEnd::Terminal(reason) => {
                error!("{}", reason);
                return Ok(());
            }
        }
    }
}

/// Poll discovery until a usable device appears, then attach.
async fn attach_device(queue: &QueueHandle, config: &Config) -> aplink_core::Result<DeviceSession> {
    loop {
        let devices = discover(queue).await?;
        if devices.is_empty() {
            debug!("No SNES devices found, retrying");
            sleep(DISCOVERY_INTERVAL).await;
            continue;
        }

        let chosen = match &config.device {
            Some(wanted) => match devices.iter().find(|device| *device == wanted) {
                Some(device) => device.clone(),
                None => {
                    warn!("Device {:?} not present (available: {:?})", wanted, devices);
                    sleep(DISCOVERY_INTERVAL).await;
                    continue;
                }
            },
            None => {
                if devices.len() > 1 {
                    info!("Multiple devices available, using {}", devices[0]);
                }
                devices[0].clone()
            }
        };

        return DeviceSession::attach(queue.clone(), &chosen).await;
    }
}

async fn console_loop(tx: mpsc::UnboundedSender<ConsoleCommand>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match line.strip_prefix('/') {
            Some("sync") => ConsoleCommand::Sync,
            Some(other) => {
                warn!("Unknown command: /{}", other);
                continue;
            }
            None => ConsoleCommand::Say(line.to_string()),
        };
        if tx.send(command).is_err() {
            break;
        }
    }
}
