pub mod arp;
pub mod forwarding;
pub mod messages;

pub use arp::ArpRelay;
pub use forwarding::FlowInstaller;
pub use messages::{ControlChannel, FlowAction, FlowMatch, FlowMod, PacketOut, SwitchMessage};
