use std::net::Ipv4Addr;

use crate::error::{Result, WireError};
use crate::proto::ANNOUNCE_PREFIX;

/// A node's self-announcement, broadcast while it waits for a collector.
///
/// Consumed once during discovery; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryAnnouncement {
    pub source_addr: Ipv4Addr,
}

impl DiscoveryAnnouncement {
    /// Parse a broadcast datagram of the form `CSI_IP,<ip>`.
    pub fn parse(text: &str) -> Result<Self> {
        let rest = text
            .trim()
            .strip_prefix(ANNOUNCE_PREFIX)
            .ok_or(WireError::NotAnAnnouncement)?;
        let addr_text = match rest.split_once(',') {
            Some((addr, _)) => addr,
            None => rest,
        };
        let source_addr = addr_text
            .trim()
            .parse()
            .map_err(|_| WireError::InvalidAnnounceAddr(addr_text.to_string()))?;
        Ok(Self { source_addr })
    }
}
