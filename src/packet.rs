use std::net::Ipv4Addr;

use pnet::packet::Packet;
use pnet::packet::arp::ArpPacket;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::util::MacAddr;

/// What an inbound frame turned out to be, decided once at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Link-layer discovery traffic; ignored outright.
    Discovery,
    Arp {
        src_mac: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
    },
    Ipv4 {
        src_mac: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
    },
    /// Anything else, including frames too short to parse.
    Other,
}

pub fn decode(data: &[u8]) -> PacketKind {
    let Some(eth) = EthernetPacket::new(data) else {
        return PacketKind::Other;
    };
    match eth.get_ethertype() {
        EtherTypes::Lldp => PacketKind::Discovery,
        EtherTypes::Arp => match ArpPacket::new(eth.payload()) {
            Some(arp) => PacketKind::Arp {
                src_mac: arp.get_sender_hw_addr(),
                src_ip: arp.get_sender_proto_addr(),
                dst_ip: arp.get_target_proto_addr(),
            },
            None => PacketKind::Other,
        },
        EtherTypes::Ipv4 => match Ipv4Packet::new(eth.payload()) {
            Some(ip) => PacketKind::Ipv4 {
                src_mac: eth.get_source(),
                src_ip: ip.get_source(),
                dst_ip: ip.get_destination(),
            },
            None => PacketKind::Other,
        },
        _ => PacketKind::Other,
    }
}
