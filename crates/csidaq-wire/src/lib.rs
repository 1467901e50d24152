//! Wire protocol for the CSI acquisition UDP link.
//!
//! Every message is a single UTF-8 text datagram: the node announces
//! itself with `CSI_IP,<ip>`, accepts `wpa2psk,...`/`peap,...`
//! provisioning lines and `start,<seconds>` commands, and streams
//! comma-delimited `CSI_DATA` records back to the host.

pub mod announce;
pub mod command;
pub mod error;
pub mod frame;
pub mod proto;

pub use announce::DiscoveryAnnouncement;
pub use command::{ProvisionCommand, StartCommand};
pub use error::{Result, WireError};
pub use frame::{CsiFrame, CSI_FIELD_COUNT};
pub use proto::{
    ANNOUNCE_PREFIX, DATA_PREFIX, DEFAULT_DATA_PORT, DISCOVERY_PORT, NODE_CONTROL_PORT,
    PROVISION_IP,
};
