use std::net::Ipv4Addr;

use thiserror::Error;

use crate::{DpId, PortNo};

/// Recoverable forwarding failures. None of these are fatal: the caller
/// degrades to dropping (or flooding) the one packet that triggered them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForwardError {
    /// The destination host has never been observed at any access port.
    #[error("no known location for host {0}")]
    HostNotFound(Ipv4Addr),

    /// The packet's source address conflicts with the registry's record of
    /// where that host attaches; treated as unknown or spoofed.
    #[error("source {ip} arrived at {dpid}:{port}, which is not its registered location")]
    SourceMismatch {
        dpid: DpId,
        port: PortNo,
        ip: Ipv4Addr,
    },

    /// Both switches are known but the graph has no path between them.
    #[error("no path from switch {src} to switch {dst}")]
    Unreachable { src: DpId, dst: DpId },
}
