//! UDP transport layer for CSI acquisition.
//!
//! Thin wrapper over `std::net::UdpSocket` giving every receiving socket
//! a bounded read timeout, so poll loops can observe cancellation and
//! deadlines between reads. No call here blocks indefinitely.

pub mod error;
pub mod udp;

pub use error::{Result, TransportError};
pub use udp::{local_ip, UdpEndpoint, POLL_TIMEOUT};
