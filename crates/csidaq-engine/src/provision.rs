use std::net::{SocketAddr, SocketAddrV4};
use std::thread::{self, JoinHandle};

use csidaq_transport::UdpEndpoint;
use csidaq_wire::{ProvisionCommand, NODE_CONTROL_PORT, PROVISION_IP};
use tracing::{info, warn};

use crate::event::{Event, EventSender};

/// One-shot transmitter for credential provisioning datagrams.
///
/// The node gives no acknowledgment over this channel: success means the
/// datagram left this host without a transport error, nothing more. The
/// node is expected to save the credentials and restart into station mode.
pub struct ProvisioningClient;

impl ProvisioningClient {
    /// Fixed provisioning address of a node running its soft-AP.
    pub fn provision_addr() -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(PROVISION_IP, NODE_CONTROL_PORT))
    }

    /// Serialize and send `command` to the node's provisioning address.
    pub fn send(command: &ProvisionCommand, bus: &EventSender) {
        Self::send_to(command, Self::provision_addr(), bus);
    }

    /// Serialize and send `command` to an explicit address.
    ///
    /// Transport failure is reported as an event; it is not retried.
    pub fn send_to(command: &ProvisionCommand, target: SocketAddr, bus: &EventSender) {
        let result =
            UdpEndpoint::sender().and_then(|endpoint| endpoint.send_text(&command.to_wire(), target));
        match result {
            Ok(()) => {
                info!(%target, ?command, "provisioning command transmitted");
                let _ = bus.send(Event::ProvisionSent);
            }
            Err(err) => {
                warn!(%err, "provisioning transmission failed");
                let _ = bus.send(Event::ProvisionFailed {
                    reason: format!("failed to transmit command: {err}"),
                });
            }
        }
    }

    /// Send on a short-lived thread so the caller is never blocked on the
    /// transport.
    pub fn spawn(command: ProvisionCommand, bus: EventSender) -> JoinHandle<()> {
        thread::spawn(move || Self::send(&command, &bus))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use super::*;
    use crate::event::event_bus;

    fn psk_command() -> ProvisionCommand {
        ProvisionCommand::Psk {
            ssid: "ResearchWiFi".to_string(),
            passphrase: "hunter2".to_string(),
            server_addr: SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 10), 50001),
        }
    }

    #[test]
    fn sends_one_datagram_and_reports_success() {
        let node = UdpEndpoint::bind(0).expect("node socket should bind");
        let target = SocketAddr::from((Ipv4Addr::LOCALHOST, node.local_addr().expect("addr").port()));

        let (bus, events) = event_bus();
        ProvisioningClient::send_to(&psk_command(), target, &bus);

        let event = events.try_recv().expect("result should be immediate");
        assert_eq!(event, Event::ProvisionSent);

        let (text, _) = node
            .recv_text()
            .expect("receive should succeed")
            .expect("datagram should arrive");
        assert_eq!(text, "wpa2psk,ResearchWiFi,hunter2,192.168.1.10,50001");
    }

    #[test]
    fn transport_failure_reports_an_error_event() {
        // Port zero is never a valid destination; the send fails locally.
        let target = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));

        let (bus, events) = event_bus();
        ProvisioningClient::send_to(&psk_command(), target, &bus);

        let event = events.try_recv().expect("result should be immediate");
        assert!(matches!(event, Event::ProvisionFailed { .. }));
    }

    #[test]
    fn spawned_send_reports_through_the_bus() {
        let node = UdpEndpoint::bind(0).expect("node socket should bind");
        let target = SocketAddr::from((Ipv4Addr::LOCALHOST, node.local_addr().expect("addr").port()));

        let (bus, events) = event_bus();
        let command = psk_command();
        let handle = thread::spawn(move || ProvisioningClient::send_to(&command, target, &bus));

        let event = events
            .recv_timeout(Duration::from_secs(5))
            .expect("event should arrive");
        assert_eq!(event, Event::ProvisionSent);
        handle.join().expect("sender thread should finish");
    }
}
