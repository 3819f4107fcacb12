use std::net::Ipv4Addr;
use std::sync::Arc;

use log::debug;
use pnet::util::MacAddr;

use crate::network::{HostTable, TopologyStore};
use crate::protocol::messages::{CONTROLLER_PORT, ControlChannel, PacketOut, SwitchMessage};
use crate::{DpId, PortNo};

/// Answers address-resolution traffic: unicast toward the known holder of
/// the requested address, otherwise flood every access port that could hide
/// an unknown host.
pub struct ArpRelay {
    topology: Arc<TopologyStore>,
    hosts: Arc<HostTable>,
    channel: Arc<dyn ControlChannel>,
}

impl ArpRelay {
    pub fn new(
        topology: Arc<TopologyStore>,
        hosts: Arc<HostTable>,
        channel: Arc<dyn ControlChannel>,
    ) -> Self {
        Self {
            topology,
            hosts,
            channel,
        }
    }

    /// Learn the requester's location, then deliver the request. Access
    /// ports that already hold a registry entry are skipped when flooding: a
    /// host that would answer is expected to be registered already.
    pub async fn relay(
        &self,
        dpid: DpId,
        in_port: PortNo,
        src_ip: Ipv4Addr,
        src_mac: MacAddr,
        dst_ip: Ipv4Addr,
        data: &[u8],
    ) {
        let snapshot = self.topology.snapshot().await;
        self.hosts
            .register(&snapshot, dpid, in_port, src_ip, src_mac)
            .await;

        match self.hosts.lookup(dst_ip).await {
            Some((dst_dpid, dst_port)) => {
                debug!("relaying request for {dst_ip} to {dst_dpid}:{dst_port}");
                let out = PacketOut::new(None, CONTROLLER_PORT, dst_port, data);
                self.channel.send(dst_dpid, SwitchMessage::PacketOut(out));
            }
            None => {
                let occupied = self.hosts.occupied_ports().await;
                let mut copies = 0usize;
                for sw in snapshot.switch_ids() {
                    let Some(ports) = snapshot.access_ports(sw) else {
                        continue;
                    };
                    for port in ports {
                        if occupied.contains(&(sw, *port)) {
                            continue;
                        }
                        let out = PacketOut::new(None, CONTROLLER_PORT, *port, data);
                        self.channel.send(sw, SwitchMessage::PacketOut(out));
                        copies += 1;
                    }
                }
                debug!("flooded request for {dst_ip} out {copies} access ports");
            }
        }
    }
}
