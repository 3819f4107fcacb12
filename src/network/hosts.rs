use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use log::debug;
use pnet::util::MacAddr;
use tokio::sync::RwLock;

use crate::network::TopologySnapshot;
use crate::{DpId, PortNo};

/// The host most recently observed behind one access port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub last_seen: DateTime<Utc>,
}

/// Where each known host attaches: (switch, access port) mapped to the
/// (ip, mac) pair most recently seen there. Last write wins; no history is
/// kept.
#[derive(Debug, Default)]
pub struct HostTable {
    entries: RwLock<BTreeMap<(DpId, PortNo), HostEntry>>,
}

impl HostTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `ip`/`mac` was observed at (`dpid`, `port`). Ignored when
    /// the port is not currently an access port of that switch: traffic
    /// relayed across interior links does not reveal a host's attachment
    /// point. Returns whether the table changed.
    pub async fn register(
        &self,
        snapshot: &TopologySnapshot,
        dpid: DpId,
        port: PortNo,
        ip: Ipv4Addr,
        mac: MacAddr,
    ) -> bool {
        if !snapshot.is_access_port(dpid, port) {
            debug!("not registering {ip} at {dpid}:{port}: not an access port");
            return false;
        }

        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&(dpid, port)) {
            if existing.ip == ip && existing.mac == mac {
                return false;
            }
        }

        debug!("host {ip} ({mac}) attached at {dpid}:{port}");
        entries.insert(
            (dpid, port),
            HostEntry {
                ip,
                mac,
                last_seen: Utc::now(),
            },
        );
        true
    }

    /// The first location, in ascending (switch, port) order, whose recorded
    /// IP matches. `None` means the host is unknown, not an error.
    pub async fn lookup(&self, ip: Ipv4Addr) -> Option<(DpId, PortNo)> {
        self.entries
            .read()
            .await
            .iter()
            .find(|(_, entry)| entry.ip == ip)
            .map(|(key, _)| *key)
    }

    /// Every (switch, port) key currently holding an entry. The relay uses
    /// this to exclude already-registered ports from floods.
    pub async fn occupied_ports(&self) -> BTreeSet<(DpId, PortNo)> {
        self.entries.read().await.keys().copied().collect()
    }

    pub async fn entries(&self) -> Vec<((DpId, PortNo), HostEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(key, entry)| (*key, *entry))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
