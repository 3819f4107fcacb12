use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use flowpath::config::ControllerConfig;
use flowpath::controller::Controller;
use flowpath::network::{LinkInfo, SwitchInfo, TopologyFeed};
use flowpath::protocol::messages::{ControlChannel, SwitchMessage};
use flowpath::DpId;

#[derive(Parser)]
#[command(name = "flowpath", about = "Shortest-path forwarding controller shell")]
struct Cli {
    /// JSON topology inventory: {"switches": [...], "links": [...]}
    #[arg(long)]
    topology: PathBuf,

    /// Controller configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also log every message the controller would send to the switches
    #[arg(long)]
    verbose: bool,
}

#[derive(serde::Deserialize)]
struct Inventory {
    switches: Vec<SwitchInfo>,
    #[serde(default)]
    links: Vec<LinkInfo>,
}

struct FileFeed {
    inventory: Inventory,
}

impl TopologyFeed for FileFeed {
    fn list_switches(&self) -> Vec<SwitchInfo> {
        self.inventory.switches.clone()
    }

    fn list_links(&self) -> Vec<LinkInfo> {
        self.inventory.links.clone()
    }
}

/// Logs every control message instead of putting it on a wire.
struct LogChannel;

impl ControlChannel for LogChannel {
    fn send(&self, dpid: DpId, message: SwitchMessage) {
        log::debug!("switch {dpid} <- {message:?}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => ControllerConfig::load_from_file(path).context("loading controller config")?,
        None => ControllerConfig::default(),
    };

    let raw = std::fs::read_to_string(&cli.topology).context("reading topology inventory")?;
    let inventory: Inventory = serde_json::from_str(&raw).context("parsing topology inventory")?;
    let switch_ids: Vec<DpId> = inventory.switches.iter().map(|sw| sw.dpid).collect();
    info!("loaded inventory with {} switches", switch_ids.len());

    let controller = Arc::new(Controller::new(
        Arc::new(FileFeed { inventory }),
        Arc::new(LogChannel),
        config,
    ));

    for dpid in switch_ids {
        controller.handle_switch_connected(dpid);
    }

    let discovery = controller.spawn_discovery();

    let mut status = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            _ = status.tick() => {
                let snapshot = controller.topology().snapshot().await;
                info!(
                    "topology: {} switches, {} links",
                    snapshot.switch_count(),
                    snapshot.link_count()
                );
                for dpid in snapshot.switch_ids() {
                    info!(
                        "switch {dpid}: interior {:?}, access {:?}",
                        snapshot.interior_ports(dpid),
                        snapshot.access_ports(dpid)
                    );
                }
                for ((dpid, port), entry) in controller.hosts().entries().await {
                    info!(
                        "host {} ({}) at {dpid}:{port}, last seen {}",
                        entry.ip, entry.mac, entry.last_seen
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    discovery.abort();
    Ok(())
}
