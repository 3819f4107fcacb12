use std::net::Ipv4Addr;
use std::sync::Arc;

use log::{debug, info};

use crate::algorithms::shortest_path;
use crate::config::ControllerConfig;
use crate::error::ForwardError;
use crate::network::TopologyStore;
use crate::protocol::messages::{ControlChannel, FlowAction, FlowMatch, FlowMod, SwitchMessage};
use crate::{DpId, PortNo};

/// Computes shortest paths between edge switches and installs the matching
/// rule on every switch along the way.
pub struct FlowInstaller {
    topology: Arc<TopologyStore>,
    channel: Arc<dyn ControlChannel>,
    priority: u16,
    idle_timeout: u16,
    hard_timeout: u16,
}

impl FlowInstaller {
    pub fn new(
        topology: Arc<TopologyStore>,
        channel: Arc<dyn ControlChannel>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            topology,
            channel,
            priority: config.flow_priority,
            idle_timeout: config.flow_idle_timeout,
            hard_timeout: config.flow_hard_timeout,
        }
    }

    /// Install `matching` along the shortest path from `src_dpid` to
    /// `dst_dpid`: one rule per intermediate switch outputting toward its
    /// successor, then a terminal rule on the destination switch emitting on
    /// `dst_port` toward the host. Returns the port the caller must use to
    /// forward the packet that triggered the computation: the first hop's
    /// egress port, or `dst_port` when both hosts share a switch.
    ///
    /// On `Unreachable` nothing is installed.
    pub async fn route(
        &self,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        src_dpid: DpId,
        dst_dpid: DpId,
        dst_port: PortNo,
        matching: FlowMatch,
        extra_actions: &[FlowAction],
    ) -> Result<PortNo, ForwardError> {
        let unreachable = ForwardError::Unreachable {
            src: src_dpid,
            dst: dst_dpid,
        };

        let snapshot = self.topology.snapshot().await;
        let path = shortest_path(&snapshot, src_dpid, dst_dpid).ok_or(unreachable)?;
        info!("path {src_ip} -> {dst_ip}: {path:?}");

        if path.len() == 1 {
            self.install(src_dpid, matching, extra_actions, dst_port);
            return Ok(dst_port);
        }

        // Resolve every hop's egress port before sending anything, so a gap
        // in the link map cannot leave the path half-installed.
        let mut hops: Vec<(DpId, PortNo)> = Vec::with_capacity(path.len());
        for pair in path.windows(2) {
            let egress = snapshot.egress_port(pair[0], pair[1]).ok_or(unreachable)?;
            hops.push((pair[0], egress));
        }
        hops.push((dst_dpid, dst_port));

        let first_hop = hops[0].1;
        for (dpid, out_port) in hops {
            self.install(dpid, matching, extra_actions, out_port);
        }
        Ok(first_hop)
    }

    fn install(
        &self,
        dpid: DpId,
        matching: FlowMatch,
        extra_actions: &[FlowAction],
        out_port: PortNo,
    ) {
        let mut actions = extra_actions.to_vec();
        actions.push(FlowAction::Output(out_port));
        debug!("switch {dpid}: install {matching:?} -> port {out_port}");
        self.channel.send(
            dpid,
            SwitchMessage::FlowMod(FlowMod {
                priority: self.priority,
                matching,
                actions,
                idle_timeout: self.idle_timeout,
                hard_timeout: self.hard_timeout,
            }),
        );
    }
}
