use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::{DpId, PortNo};

/// Reserved output port meaning "deliver to the controller" (OpenFlow 1.3).
pub const CONTROLLER_PORT: PortNo = 0xffff_fffd;

/// Priority of path rules installed by the forwarding engine.
pub const FLOW_PRIORITY: u16 = 10;
/// Priority of the table-miss rule every switch receives on connect.
pub const TABLE_MISS_PRIORITY: u16 = 0;
/// Priority of the rule discarding IPv6 traffic at the switch.
pub const DROP_IPV6_PRIORITY: u16 = 65534;

pub const ETH_TYPE_IPV4: u16 = 0x0800;
pub const ETH_TYPE_IPV6: u16 = 0x86dd;

/// Header fields a flow rule matches on; `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    pub ethertype: Option<u16>,
    pub ipv4_dst: Option<Ipv4Addr>,
}

impl FlowMatch {
    /// Matches every packet.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_ethertype(ethertype: u16) -> Self {
        Self {
            ethertype: Some(ethertype),
            ipv4_dst: None,
        }
    }

    /// Matches IPv4 traffic addressed to `dst`.
    pub fn to_ipv4(dst: Ipv4Addr) -> Self {
        Self {
            ethertype: Some(ETH_TYPE_IPV4),
            ipv4_dst: Some(dst),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    /// Emit the packet on this port.
    Output(PortNo),
}

/// A forwarding rule pushed to one switch. Installing the same rule twice
/// is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMod {
    pub priority: u16,
    pub matching: FlowMatch,
    pub actions: Vec<FlowAction>,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
}

/// A single packet pushed out of one switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketOut {
    /// Switch-side buffer holding the original packet; `None` means the raw
    /// bytes travel in `data` instead.
    pub buffer_id: Option<u32>,
    pub in_port: PortNo,
    pub actions: Vec<FlowAction>,
    pub data: Option<Vec<u8>>,
}

impl PacketOut {
    /// Bytes ride along only when no switch buffer holds the packet.
    pub fn new(buffer_id: Option<u32>, in_port: PortNo, out_port: PortNo, data: &[u8]) -> Self {
        let data = match buffer_id {
            Some(_) => None,
            None => Some(data.to_vec()),
        };
        Self {
            buffer_id,
            in_port,
            actions: vec![FlowAction::Output(out_port)],
            data,
        }
    }
}

/// Control messages this core emits; opaque to everything past the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchMessage {
    FlowMod(FlowMod),
    PacketOut(PacketOut),
}

/// Fire-and-forget control connection to the switches. Implementations
/// resolve `dpid` to a cached connection handle, opening one if needed, and
/// never report send failures back into this core.
pub trait ControlChannel: Send + Sync {
    fn send(&self, dpid: DpId, message: SwitchMessage);
}
