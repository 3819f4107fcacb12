//! End-to-end forwarding scenarios over simulated topologies: hosts announce
//! themselves through address resolution, then IPv4 traffic gets a rule per
//! switch along the shortest path.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet::packet::ipv4::MutableIpv4Packet;
use pnet::util::MacAddr;

use flowpath::config::ControllerConfig;
use flowpath::controller::Controller;
use flowpath::network::{LinkEnd, LinkInfo, SwitchInfo, TopologyFeed};
use flowpath::protocol::messages::{
    ControlChannel, FlowAction, FlowMatch, FlowMod, PacketOut, SwitchMessage,
};
use flowpath::{DpId, PortNo};

struct StaticFeed {
    switches: Vec<SwitchInfo>,
    links: Vec<LinkInfo>,
}

impl TopologyFeed for StaticFeed {
    fn list_switches(&self) -> Vec<SwitchInfo> {
        self.switches.clone()
    }

    fn list_links(&self) -> Vec<LinkInfo> {
        self.links.clone()
    }
}

#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<(DpId, SwitchMessage)>>,
}

impl RecordingChannel {
    fn flow_mods(&self) -> Vec<(DpId, FlowMod)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(dpid, message)| match message {
                SwitchMessage::FlowMod(flow) => Some((*dpid, flow.clone())),
                _ => None,
            })
            .collect()
    }

    fn packet_outs(&self) -> Vec<(DpId, PacketOut)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(dpid, message)| match message {
                SwitchMessage::PacketOut(out) => Some((*dpid, out.clone())),
                _ => None,
            })
            .collect()
    }

    fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl ControlChannel for RecordingChannel {
    fn send(&self, dpid: DpId, message: SwitchMessage) {
        self.sent.lock().unwrap().push((dpid, message));
    }
}

fn switch(dpid: DpId, ports: &[PortNo]) -> SwitchInfo {
    SwitchInfo {
        dpid,
        ports: ports.to_vec(),
    }
}

fn both_ways(a: DpId, a_port: PortNo, b: DpId, b_port: PortNo) -> [LinkInfo; 2] {
    [
        LinkInfo {
            src: LinkEnd { dpid: a, port: a_port },
            dst: LinkEnd { dpid: b, port: b_port },
        },
        LinkInfo {
            src: LinkEnd { dpid: b, port: b_port },
            dst: LinkEnd { dpid: a, port: a_port },
        },
    ]
}

fn mac(last: u8) -> MacAddr {
    MacAddr::new(0, 0, 0, 0, 0, last)
}

fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, last)
}

fn arp_request(src_mac: MacAddr, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
    let mut buf = vec![0u8; 14 + 28];
    {
        let mut eth = MutableEthernetPacket::new(&mut buf).unwrap();
        eth.set_destination(MacAddr::broadcast());
        eth.set_source(src_mac);
        eth.set_ethertype(EtherTypes::Arp);
    }
    {
        let mut arp = MutableArpPacket::new(&mut buf[14..]).unwrap();
        arp.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp.set_protocol_type(EtherTypes::Ipv4);
        arp.set_hw_addr_len(6);
        arp.set_proto_addr_len(4);
        arp.set_operation(ArpOperations::Request);
        arp.set_sender_hw_addr(src_mac);
        arp.set_sender_proto_addr(src_ip);
        arp.set_target_hw_addr(MacAddr::zero());
        arp.set_target_proto_addr(dst_ip);
    }
    buf
}

fn ipv4_frame(src_mac: MacAddr, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Vec<u8> {
    let mut buf = vec![0u8; 14 + 20];
    {
        let mut eth = MutableEthernetPacket::new(&mut buf).unwrap();
        eth.set_destination(MacAddr::broadcast());
        eth.set_source(src_mac);
        eth.set_ethertype(EtherTypes::Ipv4);
    }
    {
        let mut ipv4 = MutableIpv4Packet::new(&mut buf[14..]).unwrap();
        ipv4.set_version(4);
        ipv4.set_header_length(5);
        ipv4.set_total_length(20);
        ipv4.set_source(src_ip);
        ipv4.set_destination(dst_ip);
    }
    buf
}

async fn controller_over(
    switches: Vec<SwitchInfo>,
    links: Vec<LinkInfo>,
) -> (Arc<Controller>, Arc<RecordingChannel>) {
    let channel = Arc::new(RecordingChannel::default());
    let controller = Arc::new(Controller::new(
        Arc::new(StaticFeed { switches, links }),
        channel.clone(),
        ControllerConfig::default(),
    ));
    controller.refresh_topology().await;
    (controller, channel)
}

#[tokio::test]
async fn linear_chain_round_trip() {
    // 1 --(1/1)-- 2 --(2/1)-- 3; host A at 1:10, host B at 3:20.
    let links: Vec<_> = both_ways(1, 1, 2, 1)
        .into_iter()
        .chain(both_ways(2, 2, 3, 1))
        .collect();
    let (controller, channel) = controller_over(
        vec![switch(1, &[1, 10]), switch(2, &[1, 2]), switch(3, &[1, 20])],
        links,
    )
    .await;

    // A's request floods; B's reply unicasts back; both hosts end up known.
    controller
        .handle_packet_in(1, 10, None, &arp_request(mac(1), ip(1), ip(2)))
        .await;
    controller
        .handle_packet_in(3, 20, None, &arp_request(mac(2), ip(2), ip(1)))
        .await;
    assert_eq!(controller.hosts().lookup(ip(1)).await, Some((1, 10)));
    assert_eq!(controller.hosts().lookup(ip(2)).await, Some((3, 20)));
    channel.clear();

    // First IPv4 packet from A to B triggers the full path install.
    controller
        .handle_packet_in(1, 10, Some(42), &ipv4_frame(mac(1), ip(1), ip(2)))
        .await;

    let mods = channel.flow_mods();
    let outputs: Vec<(DpId, Vec<FlowAction>)> = mods
        .iter()
        .map(|(dpid, flow)| (*dpid, flow.actions.clone()))
        .collect();
    assert_eq!(
        outputs,
        vec![
            (1, vec![FlowAction::Output(1)]),
            (2, vec![FlowAction::Output(2)]),
            (3, vec![FlowAction::Output(20)]),
        ]
    );
    for (_, flow) in &mods {
        assert_eq!(flow.matching, FlowMatch::to_ipv4(ip(2)));
    }

    // The triggering packet leaves switch 1 toward switch 2.
    let outs = channel.packet_outs();
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].0, 1);
    assert_eq!(outs[0].1.buffer_id, Some(42));
    assert_eq!(outs[0].1.actions, vec![FlowAction::Output(1)]);
}

#[tokio::test]
async fn hosts_sharing_a_switch_get_one_rule() {
    let (controller, channel) =
        controller_over(vec![switch(1, &[10, 11])], Vec::new()).await;

    controller
        .handle_packet_in(1, 10, None, &arp_request(mac(1), ip(1), ip(2)))
        .await;
    controller
        .handle_packet_in(1, 11, None, &arp_request(mac(2), ip(2), ip(1)))
        .await;
    channel.clear();

    controller
        .handle_packet_in(1, 10, None, &ipv4_frame(mac(1), ip(1), ip(2)))
        .await;

    let mods = channel.flow_mods();
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].0, 1);
    assert_eq!(mods[0].1.actions, vec![FlowAction::Output(11)]);

    let outs = channel.packet_outs();
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].1.actions, vec![FlowAction::Output(11)]);
}

#[tokio::test]
async fn partitioned_switches_install_nothing() {
    // Two islands: no link between switch 1 and switch 2.
    let (controller, channel) =
        controller_over(vec![switch(1, &[10]), switch(2, &[20])], Vec::new()).await;

    controller
        .handle_packet_in(1, 10, None, &arp_request(mac(1), ip(1), ip(2)))
        .await;
    controller
        .handle_packet_in(2, 20, None, &arp_request(mac(2), ip(2), ip(1)))
        .await;
    channel.clear();

    controller
        .handle_packet_in(1, 10, None, &ipv4_frame(mac(1), ip(1), ip(2)))
        .await;

    assert!(channel.flow_mods().is_empty());
    assert!(channel.packet_outs().is_empty());
}

#[tokio::test]
async fn resolution_flood_reaches_only_silent_access_ports() {
    // Two switches, two access ports each, nobody registered. A request
    // arriving over the interior link floods all four.
    let links: Vec<_> = both_ways(1, 1, 2, 2).into_iter().collect();
    let (controller, channel) = controller_over(
        vec![switch(1, &[1, 10, 11]), switch(2, &[2, 20, 21])],
        links,
    )
    .await;

    controller
        .handle_packet_in(1, 1, None, &arp_request(mac(1), ip(1), ip(9)))
        .await;

    let outs = channel.packet_outs();
    assert_eq!(outs.len(), 4);
    let targets: Vec<(DpId, FlowAction)> = outs
        .iter()
        .map(|(dpid, out)| (*dpid, out.actions[0]))
        .collect();
    assert_eq!(
        targets,
        vec![
            (1, FlowAction::Output(10)),
            (1, FlowAction::Output(11)),
            (2, FlowAction::Output(20)),
            (2, FlowAction::Output(21)),
        ]
    );
}

#[tokio::test]
async fn link_failure_discovered_on_refresh_stops_new_installs() {
    let links: Vec<_> = both_ways(1, 1, 2, 2).into_iter().collect();
    let (controller, channel) =
        controller_over(vec![switch(1, &[1, 10]), switch(2, &[2, 20])], links).await;

    controller
        .handle_packet_in(1, 10, None, &arp_request(mac(1), ip(1), ip(2)))
        .await;
    controller
        .handle_packet_in(2, 20, None, &arp_request(mac(2), ip(2), ip(1)))
        .await;
    channel.clear();

    controller
        .handle_packet_in(1, 10, None, &ipv4_frame(mac(1), ip(1), ip(2)))
        .await;
    assert_eq!(channel.flow_mods().len(), 2);
    channel.clear();

    // The link vanishes from the next scan; the same flow now has no path.
    let partitioned = StaticFeed {
        switches: vec![switch(1, &[1, 10]), switch(2, &[2, 20])],
        links: Vec::new(),
    };
    controller.topology().refresh(&partitioned).await;

    controller
        .handle_packet_in(1, 10, None, &ipv4_frame(mac(1), ip(1), ip(2)))
        .await;
    assert!(channel.flow_mods().is_empty());
}
