pub mod hosts;
pub mod topology;

pub use hosts::{HostEntry, HostTable};
pub use topology::{LinkEnd, LinkInfo, SwitchInfo, TopologyFeed, TopologySnapshot, TopologyStore};
