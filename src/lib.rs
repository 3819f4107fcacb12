pub mod algorithms;
pub mod config;
pub mod controller;
pub mod error;
pub mod network;
pub mod packet;
pub mod protocol;

/// Datapath id of a switch, stable for the controller session.
pub type DpId = u64;
/// Switch port number.
pub type PortNo = u32;

pub use config::ControllerConfig;
pub use controller::Controller;
pub use error::ForwardError;
