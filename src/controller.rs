use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ControllerConfig;
use crate::error::ForwardError;
use crate::network::{HostTable, TopologyFeed, TopologyStore};
use crate::packet::{PacketKind, decode};
use crate::protocol::arp::ArpRelay;
use crate::protocol::forwarding::FlowInstaller;
use crate::protocol::messages::{
    CONTROLLER_PORT, ControlChannel, DROP_IPV6_PRIORITY, ETH_TYPE_IPV6, FlowAction, FlowMatch,
    FlowMod, PacketOut, SwitchMessage, TABLE_MISS_PRIORITY,
};
use crate::{DpId, PortNo};

/// The forwarding control plane: learns the topology and the hosts behind
/// it, and reacts to packet-in events by installing shortest-path rules or
/// relaying address-resolution traffic.
pub struct Controller {
    topology: Arc<TopologyStore>,
    hosts: Arc<HostTable>,
    installer: FlowInstaller,
    arp: ArpRelay,
    feed: Arc<dyn TopologyFeed>,
    channel: Arc<dyn ControlChannel>,
    config: ControllerConfig,
    refresh_tx: watch::Sender<()>,
}

impl Controller {
    pub fn new(
        feed: Arc<dyn TopologyFeed>,
        channel: Arc<dyn ControlChannel>,
        config: ControllerConfig,
    ) -> Self {
        let topology = Arc::new(TopologyStore::new());
        let hosts = Arc::new(HostTable::new());
        let installer = FlowInstaller::new(topology.clone(), channel.clone(), &config);
        let arp = ArpRelay::new(topology.clone(), hosts.clone(), channel.clone());
        let (refresh_tx, _) = watch::channel(());

        Self {
            topology,
            hosts,
            installer,
            arp,
            feed,
            channel,
            config,
            refresh_tx,
        }
    }

    pub fn topology(&self) -> &Arc<TopologyStore> {
        &self.topology
    }

    pub fn hosts(&self) -> &Arc<HostTable> {
        &self.hosts
    }

    /// Re-read the switch, port and link inventory right now.
    pub async fn refresh_topology(&self) {
        self.topology.refresh(self.feed.as_ref()).await;
    }

    /// Ask the discovery task for an immediate extra refresh, e.g. after a
    /// switch or link up/down event.
    pub fn notify_topology_change(&self) {
        let _ = self.refresh_tx.send(());
    }

    /// Periodic re-discovery loop. Independent of packet processing: packet
    /// handlers keep reading the previously published snapshot while a new
    /// one is being built. Runs until the handle is aborted.
    pub fn spawn_discovery(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = self.clone();
        let mut nudge = self.refresh_tx.subscribe();
        tokio::spawn(async move {
            let period = Duration::from_millis(controller.config.discovery_interval_ms.max(1));
            let mut tick = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = nudge.changed() => {}
                }
                controller.refresh_topology().await;
            }
        })
    }

    /// Bootstrap rules for a switch that just completed its handshake: a
    /// table-miss rule steering unmatched traffic to the controller, and a
    /// discard rule keeping IPv6 off the packet-in path.
    pub fn handle_switch_connected(&self, dpid: DpId) {
        info!("switch {dpid} connected, installing bootstrap rules");
        self.channel.send(
            dpid,
            SwitchMessage::FlowMod(FlowMod {
                priority: TABLE_MISS_PRIORITY,
                matching: FlowMatch::all(),
                actions: vec![FlowAction::Output(CONTROLLER_PORT)],
                idle_timeout: 0,
                hard_timeout: 0,
            }),
        );
        self.channel.send(
            dpid,
            SwitchMessage::FlowMod(FlowMod {
                priority: DROP_IPV6_PRIORITY,
                matching: FlowMatch::for_ethertype(ETH_TYPE_IPV6),
                actions: Vec::new(),
                idle_timeout: 0,
                hard_timeout: 0,
            }),
        );
    }

    /// One inbound packet event. Every failure degrades to dropping (or
    /// flooding) this single packet; nothing here is fatal.
    pub async fn handle_packet_in(
        &self,
        dpid: DpId,
        in_port: PortNo,
        buffer_id: Option<u32>,
        data: &[u8],
    ) {
        match decode(data) {
            PacketKind::Discovery => {}
            PacketKind::Arp {
                src_mac,
                src_ip,
                dst_ip,
            } => {
                debug!("arp {src_ip} -> {dst_ip} at {dpid}:{in_port}");
                self.arp
                    .relay(dpid, in_port, src_ip, src_mac, dst_ip, data)
                    .await;
            }
            PacketKind::Ipv4 {
                src_mac,
                src_ip,
                dst_ip,
            } => {
                if src_ip != Ipv4Addr::UNSPECIFIED && src_ip != Ipv4Addr::BROADCAST {
                    let snapshot = self.topology.snapshot().await;
                    self.hosts
                        .register(&snapshot, dpid, in_port, src_ip, src_mac)
                        .await;
                }
                match self
                    .forward_ipv4(dpid, in_port, buffer_id, src_ip, dst_ip, data)
                    .await
                {
                    Ok(out_port) => {
                        debug!("forwarded {src_ip} -> {dst_ip} out port {out_port}")
                    }
                    Err(err) => debug!("dropping {src_ip} -> {dst_ip}: {err}"),
                }
            }
            PacketKind::Other => {}
        }
    }

    /// Resolve the edge switches for an IPv4 flow, install the path, and
    /// send the triggering packet along its first hop.
    pub async fn forward_ipv4(
        &self,
        dpid: DpId,
        in_port: PortNo,
        buffer_id: Option<u32>,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        data: &[u8],
    ) -> Result<PortNo, ForwardError> {
        let snapshot = self.topology.snapshot().await;

        // A packet arriving on an access port must come from the host
        // registered there; anything else is spoofed or stale. Interior
        // in-ports carry transit traffic and skip the check.
        if snapshot.is_access_port(dpid, in_port)
            && self.hosts.lookup(src_ip).await != Some((dpid, in_port))
        {
            return Err(ForwardError::SourceMismatch {
                dpid,
                port: in_port,
                ip: src_ip,
            });
        }

        let (dst_dpid, dst_port) = self
            .hosts
            .lookup(dst_ip)
            .await
            .ok_or(ForwardError::HostNotFound(dst_ip))?;

        let out_port = self
            .installer
            .route(
                src_ip,
                dst_ip,
                dpid,
                dst_dpid,
                dst_port,
                FlowMatch::to_ipv4(dst_ip),
                &[],
            )
            .await?;

        self.channel.send(
            dpid,
            SwitchMessage::PacketOut(PacketOut::new(buffer_id, in_port, out_port, data)),
        );
        Ok(out_port)
    }
}
