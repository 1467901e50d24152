use std::fmt;
use std::net::SocketAddrV4;

/// Wi-Fi credential provisioning command.
///
/// One variant per authentication protocol the node supports; the
/// serialized line leads with the variant tag so the node can route the
/// remaining fields. Constructed by the caller, transmitted once,
/// then discarded.
#[derive(Clone, PartialEq, Eq)]
pub enum ProvisionCommand {
    /// WPA2-PSK (personal) credentials.
    Psk {
        ssid: String,
        passphrase: String,
        /// Host callback address the node should stream CSI records to.
        server_addr: SocketAddrV4,
    },
    /// WPA2-Enterprise (PEAP) credentials.
    Enterprise {
        ssid: String,
        identity: String,
        passphrase: String,
        server_addr: SocketAddrV4,
    },
}

impl ProvisionCommand {
    /// Wire encoding: one comma-joined line, variant tag first.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Psk {
                ssid,
                passphrase,
                server_addr,
            } => format!(
                "wpa2psk,{ssid},{passphrase},{},{}",
                server_addr.ip(),
                server_addr.port()
            ),
            Self::Enterprise {
                ssid,
                identity,
                passphrase,
                server_addr,
            } => format!(
                "peap,{ssid},{identity},{passphrase},{},{}",
                server_addr.ip(),
                server_addr.port()
            ),
        }
    }
}

// Passphrases are credential material and must not reach logs.
impl fmt::Debug for ProvisionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Psk {
                ssid, server_addr, ..
            } => f
                .debug_struct("Psk")
                .field("ssid", ssid)
                .field("passphrase", &"<redacted>")
                .field("server_addr", server_addr)
                .finish(),
            Self::Enterprise {
                ssid,
                identity,
                server_addr,
                ..
            } => f
                .debug_struct("Enterprise")
                .field("ssid", ssid)
                .field("identity", identity)
                .field("passphrase", &"<redacted>")
                .field("server_addr", server_addr)
                .finish(),
        }
    }
}

/// Acquisition start command.
///
/// Retransmitted on a fixed interval until the first data frame arrives;
/// the node treats repeats as idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCommand {
    pub duration_secs: u32,
}

impl StartCommand {
    /// Wire encoding: `start,<seconds>`.
    pub fn to_wire(&self) -> String {
        format!("start,{}", self.duration_secs)
    }
}
