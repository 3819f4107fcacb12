use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{DpId, PortNo};

/// One switch as reported by the discovery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchInfo {
    pub dpid: DpId,
    pub ports: Vec<PortNo>,
}

/// One end of a directed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEnd {
    pub dpid: DpId,
    pub port: PortNo,
}

/// A directed switch-to-switch link. The reverse direction, if present,
/// arrives as a separate link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInfo {
    pub src: LinkEnd,
    pub dst: LinkEnd,
}

/// Source of the raw topology inventory, polled by the discovery task.
pub trait TopologyFeed: Send + Sync {
    fn list_switches(&self) -> Vec<SwitchInfo>;
    fn list_links(&self) -> Vec<LinkInfo>;
}

/// An immutable view of the network at one discovery pass: the active ports
/// of every switch, their interior/access classification, and the directed
/// links annotated with the egress port used in each direction.
///
/// Every port is either interior (a link endpoint) or access (the
/// remainder); the two sets partition the active ports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    ports: BTreeMap<DpId, BTreeSet<PortNo>>,
    interior: BTreeMap<DpId, BTreeSet<PortNo>>,
    access: BTreeMap<DpId, BTreeSet<PortNo>>,
    links: BTreeMap<(DpId, DpId), (PortNo, PortNo)>,
    neighbors: BTreeMap<DpId, BTreeSet<DpId>>,
}

impl TopologySnapshot {
    /// Classify every reported port and index the link set. Links naming a
    /// switch absent from `switches` are skipped, so the result reflects
    /// exactly this discovery pass and nothing older.
    pub fn build(switches: &[SwitchInfo], links: &[LinkInfo]) -> Self {
        let mut snap = Self::default();

        for sw in switches {
            snap.ports.insert(sw.dpid, sw.ports.iter().copied().collect());
            snap.interior.insert(sw.dpid, BTreeSet::new());
            snap.neighbors.insert(sw.dpid, BTreeSet::new());
        }

        for link in links {
            if !snap.ports.contains_key(&link.src.dpid) || !snap.ports.contains_key(&link.dst.dpid)
            {
                debug!(
                    "ignoring link {}:{} -> {}:{}: endpoint not in current switch list",
                    link.src.dpid, link.src.port, link.dst.dpid, link.dst.port
                );
                continue;
            }
            snap.links
                .insert((link.src.dpid, link.dst.dpid), (link.src.port, link.dst.port));
            if let Some(interior) = snap.interior.get_mut(&link.src.dpid) {
                interior.insert(link.src.port);
            }
            if let Some(interior) = snap.interior.get_mut(&link.dst.dpid) {
                interior.insert(link.dst.port);
            }
            if let Some(neighbors) = snap.neighbors.get_mut(&link.src.dpid) {
                neighbors.insert(link.dst.dpid);
            }
        }

        for (dpid, all_ports) in &snap.ports {
            let interior = snap.interior.get(dpid).cloned().unwrap_or_default();
            snap.access
                .insert(*dpid, all_ports.difference(&interior).copied().collect());
        }

        snap
    }

    pub fn switch_count(&self) -> usize {
        self.ports.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn contains(&self, dpid: DpId) -> bool {
        self.ports.contains_key(&dpid)
    }

    /// Switch ids in ascending order.
    pub fn switch_ids(&self) -> impl Iterator<Item = DpId> + '_ {
        self.ports.keys().copied()
    }

    /// All active ports of a switch.
    pub fn ports(&self, dpid: DpId) -> Option<&BTreeSet<PortNo>> {
        self.ports.get(&dpid)
    }

    /// Ports connected to other switches.
    pub fn interior_ports(&self, dpid: DpId) -> Option<&BTreeSet<PortNo>> {
        self.interior.get(&dpid)
    }

    /// Ports connected to end hosts.
    pub fn access_ports(&self, dpid: DpId) -> Option<&BTreeSet<PortNo>> {
        self.access.get(&dpid)
    }

    pub fn is_access_port(&self, dpid: DpId, port: PortNo) -> bool {
        self.access
            .get(&dpid)
            .is_some_and(|ports| ports.contains(&port))
    }

    /// Switches directly reachable from `dpid`, in ascending id order.
    pub fn neighbors(&self, dpid: DpId) -> impl Iterator<Item = DpId> + '_ {
        self.neighbors
            .get(&dpid)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// The local port `src` uses to reach `dst` over a direct link.
    pub fn egress_port(&self, src: DpId, dst: DpId) -> Option<PortNo> {
        self.links.get(&(src, dst)).map(|(src_port, _)| *src_port)
    }

    /// All directed links as (src, dst, src port, dst port).
    pub fn links(&self) -> impl Iterator<Item = (DpId, DpId, PortNo, PortNo)> + '_ {
        self.links
            .iter()
            .map(|((src, dst), (sp, dp))| (*src, *dst, *sp, *dp))
    }
}

/// Shared handle to the current topology. `refresh` builds a replacement
/// snapshot off to the side and publishes it with a single pointer store, so
/// a reader that cloned the `Arc` out keeps a complete, consistent view for
/// as long as it needs one.
#[derive(Debug, Default)]
pub struct TopologyStore {
    current: RwLock<Arc<TopologySnapshot>>,
}

impl TopologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published snapshot.
    pub async fn snapshot(&self) -> Arc<TopologySnapshot> {
        self.current.read().await.clone()
    }

    /// Re-read the full switch, port and link inventory and atomically
    /// replace the published snapshot. An empty inventory yields an empty
    /// snapshot; path lookups then simply find no path.
    pub async fn refresh(&self, feed: &dyn TopologyFeed) -> Arc<TopologySnapshot> {
        let switches = feed.list_switches();
        let links = feed.list_links();
        let snap = Arc::new(TopologySnapshot::build(&switches, &links));

        let mut current = self.current.write().await;
        if *current != snap {
            info!(
                "topology changed: {} switches, {} links",
                snap.switch_count(),
                snap.link_count()
            );
        }
        *current = snap.clone();
        snap
    }
}
